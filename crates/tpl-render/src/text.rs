//! Text layout shared by the Vello painter and the export rasterizer.
//!
//! Fonts come from a [`FontBook`]: hosts register faces by family name and
//! anything unknown falls back to the embedded DejaVu Sans. Layout is plain
//! left-to-right: characters map through the font's `cmap`, advances come
//! from `hmtx`, and lines break at spaces to fit the element width. There is
//! no shaping, so ligatures and complex scripts render glyph by glyph.

use kurbo::{Affine, BezPath, Point, Rect};
use peniko::{Blob, Font};
use skrifa::instance::{LocationRef, Size as FontSize};
use skrifa::outline::OutlinePen;
use skrifa::{FontRef, GlyphId, MetadataProvider};
use std::sync::Arc;
use tpl_core::model::{Color, FontWeight, TextAlign, TextStyle};

static SANS_REGULAR: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static SANS_BOLD: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

/// Family name of the embedded fallback face.
pub const FALLBACK_FAMILY: &str = "DejaVu Sans";
/// Line advance as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.2;
/// Horizontal shear for synthesized italics (about 12 degrees).
pub const ITALIC_SKEW: f64 = 0.21;

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("font data for `{family}` could not be read: {reason}")]
    Unreadable { family: String, reason: String },
}

#[derive(Clone)]
struct Face {
    family: String,
    weight: FontWeight,
    font: Font,
}

/// Registered font faces, looked up by family and weight.
#[derive(Clone)]
pub struct FontBook {
    faces: Vec<Face>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl FontBook {
    /// A book holding only the embedded fallback faces.
    pub fn new() -> Self {
        let embedded = |data: &'static [u8], weight| Face {
            family: FALLBACK_FAMILY.to_string(),
            weight,
            font: Font::new(Blob::new(Arc::new(data)), 0),
        };
        Self {
            faces: vec![
                embedded(SANS_REGULAR, FontWeight::Normal),
                embedded(SANS_BOLD, FontWeight::Bold),
            ],
        }
    }

    /// Add (or replace) the face for `family` at `weight`.
    ///
    /// # Errors
    ///
    /// Returns [`FontError::Unreadable`] if `data` is not a font file.
    pub fn register(&mut self, family: &str, weight: FontWeight, data: Vec<u8>) -> Result<(), FontError> {
        if let Err(e) = FontRef::from_index(&data, 0) {
            return Err(FontError::Unreadable {
                family: family.to_string(),
                reason: e.to_string(),
            });
        }
        let family = family.trim().to_string();
        self.faces
            .retain(|f| !(f.family.eq_ignore_ascii_case(&family) && f.weight == weight));
        log::debug!("register font {family} {weight:?} ({} bytes)", data.len());
        self.faces.push(Face {
            family,
            weight,
            font: Font::new(Blob::from(data), 0),
        });
        Ok(())
    }

    pub fn families(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.faces.iter().map(|f| f.family.as_str()).collect();
        names.dedup();
        names
    }

    /// Resolve a CSS-style family list (`"Brand, Arial, sans-serif"`).
    /// Each name is tried in order at the requested weight, then at any
    /// weight; the embedded face is the last resort.
    pub fn resolve(&self, families: &str, weight: FontWeight) -> &Font {
        let wanted: Vec<&str> = families
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|name| !name.is_empty())
            .collect();
        for name in wanted.iter().copied().chain([FALLBACK_FAMILY]) {
            let mut matching = self.faces.iter().filter(|f| f.family.eq_ignore_ascii_case(name));
            let exact = matching.clone().find(|f| f.weight == weight);
            if let Some(face) = exact.or_else(|| matching.next()) {
                return &face.font;
            }
        }
        &self.faces[0].font
    }
}

// ─── Layout ──────────────────────────────────────────────────────────────

/// A glyph placed on its baseline, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

/// A laid-out text element, ready for either painter.
#[derive(Clone)]
pub struct TextLayout {
    pub font: Font,
    pub font_size: f32,
    pub color: Color,
    pub glyphs: Vec<PlacedGlyph>,
    /// Underline bars, one per line.
    pub decorations: Vec<Rect>,
    /// Shear applied to each glyph outline for italics.
    pub skew: Option<f64>,
    /// Text never paints outside its element box.
    pub clip: Rect,
}

/// Lay out `style.content` inside `rect`. Lines wrap at spaces to the box
/// width, honour explicit newlines, and stop once a line would start below
/// the box. Returns `None` when the resolved font cannot be parsed.
pub fn layout_text(fonts: &FontBook, rect: Rect, style: &TextStyle) -> Option<TextLayout> {
    let font = fonts.resolve(&style.font_family, style.weight);
    let font_ref = FontRef::from_index(font.data.data(), font.index).ok()?;
    let size = FontSize::new(style.font_size);
    let metrics = font_ref.metrics(size, LocationRef::default());
    let advances = font_ref.glyph_metrics(size, LocationRef::default());
    let charmap = font_ref.charmap();

    let glyph_for = |ch: char| {
        let id = charmap.map(ch).unwrap_or(GlyphId::NOTDEF);
        let advance = advances.advance_width(id).unwrap_or(0.0);
        (id, f64::from(advance))
    };
    let measure = |text: &str| text.chars().map(|ch| glyph_for(ch).1).sum::<f64>();

    let font_size = f64::from(style.font_size);
    let line_height = font_size * LINE_HEIGHT;
    let ascent = f64::from(metrics.ascent);
    let (underline_offset, underline_thickness) = match metrics.underline {
        Some(d) => (f64::from(d.offset), f64::from(d.thickness).max(1.0)),
        None => (-font_size / 10.0, (font_size / 15.0).max(1.0)),
    };

    let mut layout = TextLayout {
        font: font.clone(),
        font_size: style.font_size,
        color: style.color,
        glyphs: Vec::new(),
        decorations: Vec::new(),
        skew: style.italic.then_some(ITALIC_SKEW),
        clip: rect,
    };
    for (idx, line) in wrap_lines(&style.content, rect.width(), &measure).iter().enumerate() {
        let top = rect.y0 + idx as f64 * line_height;
        if top > rect.y1 {
            break;
        }
        let width = measure(line);
        let mut x = match style.align {
            TextAlign::Left => rect.x0,
            TextAlign::Center => rect.center().x - width / 2.0,
            TextAlign::Right => rect.x1 - width,
        };
        let baseline = top + (line_height - font_size) / 2.0 + ascent;
        if style.underline && width > 0.0 {
            // Decoration offsets are y-up from the baseline.
            let y = baseline - underline_offset;
            layout.decorations.push(Rect::new(x, y, x + width, y + underline_thickness));
        }
        for ch in line.chars() {
            let (id, advance) = glyph_for(ch);
            if !ch.is_whitespace() {
                layout.glyphs.push(PlacedGlyph {
                    id: id.to_u32(),
                    x,
                    y: baseline,
                });
            }
            x += advance;
        }
    }
    Some(layout)
}

/// Greedy word wrap. A single word wider than the box keeps its own line.
pub fn wrap_lines(text: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if line.is_empty() || measure(&candidate) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            }
        }
        lines.push(line);
    }
    lines
}

impl TextLayout {
    /// Canvas-space outline of every glyph, for painters without a glyph
    /// cache of their own. Glyphs the font cannot draw are left out.
    pub fn outlines(&self) -> Vec<BezPath> {
        let Ok(font_ref) = FontRef::from_index(self.font.data.data(), self.font.index) else {
            return Vec::new();
        };
        let collection = font_ref.outline_glyphs();
        let size = FontSize::new(self.font_size);
        let mut paths = Vec::with_capacity(self.glyphs.len());
        for glyph in &self.glyphs {
            let Some(outline) = collection.get(GlyphId::new(glyph.id)) else {
                continue;
            };
            let mut pen = CanvasPen {
                path: BezPath::new(),
                origin: Point::new(glyph.x, glyph.y),
                skew: self.skew.unwrap_or(0.0),
            };
            match outline.draw((size, LocationRef::default()), &mut pen) {
                Ok(_) => paths.push(pen.path),
                Err(e) => log::trace!("glyph {} not drawn: {e:?}", glyph.id),
            }
        }
        paths
    }

    /// Per-glyph shear for Vello's glyph transform.
    pub fn glyph_transform(&self) -> Option<Affine> {
        self.skew.map(|s| Affine::skew(s, 0.0))
    }
}

/// Flips font units (y-up) onto the canvas (y-down) at a glyph origin.
struct CanvasPen {
    path: BezPath,
    origin: Point,
    skew: f64,
}

impl CanvasPen {
    fn map(&self, x: f32, y: f32) -> Point {
        let (x, y) = (f64::from(x), f64::from(y));
        Point::new(self.origin.x + x + self.skew * y, self.origin.y - y)
    }
}

impl OutlinePen for CanvasPen {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.path.move_to(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.path.line_to(p);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let (c, p) = (self.map(cx0, cy0), self.map(x, y));
        self.path.quad_to(c, p);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let (c0, c1, p) = (self.map(cx0, cy0), self.map(cx1, cy1), self.map(x, y));
        self.path.curve_to(c0, c1, p);
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}
