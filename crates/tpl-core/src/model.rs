//! Element data model for template documents.
//!
//! An [`Element`] is one placed object on the canvas. The geometry common to
//! every element (bounding box, rotation, z-index, opacity) lives on the
//! element itself; everything that only makes sense for one kind of object
//! lives in the [`ElementKind`] payload, so renderers and the property editor
//! branch exhaustively on the kind instead of probing optional fields.
//!
//! Edits arrive as [`Attr`] values. An attribute that is meaningless for the
//! element's kind is ignored, and every value is normalized on the way in
//! (non-negative sizes, opacity in `[0, 1]`, rotation in `[0, 360)`).

use crate::id::ElementId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color, 8 bits per channel. Serialized as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let short = |i: usize| hex_val(bytes[i]).map(|v| v * 17);
        let long = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);

        match bytes.len() {
            3 => Some(Self::rgb(short(0)?, short(1)?, short(2)?)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgb(long(0)?, long(2)?, long(4)?)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn alpha(&self) -> f32 {
        f32::from(self.a) / 255.0
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// Logical canvas size in canvas units (not device pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanned by two arbitrary corners, normalized with min/max.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Whether `other` lies fully inside `self` (edges may touch).
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// AABB overlap test.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Normalize degrees into `[0, 360)`.
pub fn normalize_rotation(degrees: f32) -> f32 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if r >= 360.0 { 0.0 } else { r }
}

// ─── Text ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Horizontal text alignment inside the element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub content: String,
    pub color: Color,
    pub font_family: String,
    pub font_size: f32,
    #[serde(default)]
    pub weight: FontWeight,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: "Double click to edit".into(),
            color: Color::BLACK,
            font_family: "Arial".into(),
            font_size: 24.0,
            weight: FontWeight::Normal,
            italic: false,
            underline: false,
            align: TextAlign::Left,
        }
    }
}

// ─── Images ──────────────────────────────────────────────────────────────

/// Image filter parameters. `blur` is a radius in canvas units; brightness
/// and contrast are multipliers where `1.0` leaves the image unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageFilters {
    pub blur: f32,
    pub brightness: f32,
    pub contrast: f32,
}

impl Default for ImageFilters {
    fn default() -> Self {
        Self {
            blur: 0.0,
            brightness: 1.0,
            contrast: 1.0,
        }
    }
}

impl ImageFilters {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAttrs {
    /// Source reference, usually a `data:` URL produced by the upload tool.
    pub src: String,
    #[serde(default)]
    pub filters: ImageFilters,
}

// ─── Shapes, lines, strokes ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
    Triangle,
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeAttrs {
    pub shape: ShapeKind,
    pub fill: Color,
    #[serde(default)]
    pub corner_radius: f32,
}

impl Default for ShapeAttrs {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Rectangle,
            fill: Color::rgb(0x3B, 0x82, 0xF6),
            corner_radius: 0.0,
        }
    }
}

/// Stroke used by lines and arrows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeAttrs {
    pub color: Color,
    #[serde(rename = "strokeWidth")]
    pub width: f32,
}

impl Default for StrokeAttrs {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 2.0,
        }
    }
}

/// A freehand polyline stored as an element. Points are relative to the
/// element's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandAttrs {
    pub points: Vec<(f32, f32)>,
    pub color: Color,
    #[serde(rename = "strokeWidth")]
    pub width: f32,
}

// ─── Element ─────────────────────────────────────────────────────────────

/// Kind-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ElementKind {
    Text(TextStyle),
    Image(ImageAttrs),
    Shape(ShapeAttrs),
    Line(StrokeAttrs),
    Arrow(StrokeAttrs),
    Freehand(FreehandAttrs),
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Text(_) => "text",
            ElementKind::Image(_) => "image",
            ElementKind::Shape(_) => "shape",
            ElementKind::Line(_) => "line",
            ElementKind::Arrow(_) => "arrow",
            ElementKind::Freehand(_) => "freehand",
        }
    }
}

fn default_opacity() -> f32 {
    1.0
}

/// A single placed object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees in `[0, 360)`, applied about the element's own center.
    #[serde(default)]
    pub rotation: f32,
    /// Paint order; ties are broken by insertion order.
    #[serde(default)]
    pub z_index: u32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(flatten)]
    pub kind: ElementKind,
}

/// A single attribute edit. A list of these is the partial update accepted
/// by the scene store.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    X(f32),
    Y(f32),
    Width(f32),
    Height(f32),
    Rotation(f32),
    Opacity(f32),
    ZIndex(u32),
    // text
    Content(String),
    TextColor(Color),
    FontFamily(String),
    FontSize(f32),
    FontWeight(FontWeight),
    Italic(bool),
    Underline(bool),
    Align(TextAlign),
    // shape
    Shape(ShapeKind),
    Fill(Color),
    CornerRadius(f32),
    // line / arrow / freehand
    StrokeColor(Color),
    StrokeWidth(f32),
    // image
    Src(String),
    Blur(f32),
    Brightness(f32),
    Contrast(f32),
}

/// Partial update: the attributes to change, in order.
pub type ElementPatch = SmallVec<[Attr; 4]>;

impl Attr {
    fn number(&self) -> Option<f32> {
        match *self {
            Attr::X(v)
            | Attr::Y(v)
            | Attr::Width(v)
            | Attr::Height(v)
            | Attr::Rotation(v)
            | Attr::Opacity(v)
            | Attr::FontSize(v)
            | Attr::CornerRadius(v)
            | Attr::StrokeWidth(v)
            | Attr::Blur(v)
            | Attr::Brightness(v)
            | Attr::Contrast(v) => Some(v),
            _ => None,
        }
    }
}

impl Element {
    /// Build an element from a spec, normalizing every numeric attribute.
    pub fn from_spec(id: ElementId, z_index: u32, spec: ElementSpec) -> Self {
        let mut element = Self {
            id,
            x: spec.x,
            y: spec.y,
            width: spec.width,
            height: spec.height,
            rotation: spec.rotation,
            z_index,
            opacity: spec.opacity,
            kind: spec.kind,
        };
        element.normalize();
        element
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    pub fn center(&self) -> (f32, f32) {
        self.bounds().center()
    }

    /// Clamp every attribute into its valid range.
    pub fn normalize(&mut self) {
        self.width = self.width.max(0.0);
        self.height = self.height.max(0.0);
        self.rotation = normalize_rotation(self.rotation);
        self.opacity = self.opacity.clamp(0.0, 1.0);
        match &mut self.kind {
            ElementKind::Text(t) => t.font_size = t.font_size.max(1.0),
            ElementKind::Image(i) => {
                i.filters.blur = i.filters.blur.max(0.0);
                i.filters.brightness = i.filters.brightness.max(0.0);
                i.filters.contrast = i.filters.contrast.max(0.0);
            }
            ElementKind::Shape(s) => s.corner_radius = s.corner_radius.max(0.0),
            ElementKind::Line(s) | ElementKind::Arrow(s) => s.width = s.width.max(0.0),
            ElementKind::Freehand(f) => f.width = f.width.max(0.0),
        }
    }

    /// Whether every numeric attribute is finite.
    pub fn is_finite(&self) -> bool {
        let common = [self.x, self.y, self.width, self.height, self.rotation, self.opacity];
        if !common.iter().all(|v| v.is_finite()) {
            return false;
        }
        match &self.kind {
            ElementKind::Text(t) => t.font_size.is_finite(),
            ElementKind::Image(i) => {
                i.filters.blur.is_finite()
                    && i.filters.brightness.is_finite()
                    && i.filters.contrast.is_finite()
            }
            ElementKind::Shape(s) => s.corner_radius.is_finite(),
            ElementKind::Line(s) | ElementKind::Arrow(s) => s.width.is_finite(),
            ElementKind::Freehand(f) => {
                f.width.is_finite() && f.points.iter().all(|(x, y)| x.is_finite() && y.is_finite())
            }
        }
    }

    /// Apply one attribute edit. Returns `false` when the attribute does not
    /// apply to this element's kind or carries a non-finite number; the
    /// element is left untouched in that case.
    pub fn apply(&mut self, attr: &Attr) -> bool {
        if attr.number().is_some_and(|v| !v.is_finite()) {
            return false;
        }
        let applied = match (attr, &mut self.kind) {
            (Attr::X(v), _) => set(&mut self.x, *v),
            (Attr::Y(v), _) => set(&mut self.y, *v),
            (Attr::Width(v), _) => set(&mut self.width, *v),
            (Attr::Height(v), _) => set(&mut self.height, *v),
            (Attr::Rotation(v), _) => set(&mut self.rotation, *v),
            (Attr::Opacity(v), _) => set(&mut self.opacity, *v),
            (Attr::ZIndex(v), _) => set(&mut self.z_index, *v),

            (Attr::Content(v), ElementKind::Text(t)) => set(&mut t.content, v.clone()),
            (Attr::TextColor(v), ElementKind::Text(t)) => set(&mut t.color, *v),
            (Attr::FontFamily(v), ElementKind::Text(t)) => set(&mut t.font_family, v.clone()),
            (Attr::FontSize(v), ElementKind::Text(t)) => set(&mut t.font_size, *v),
            (Attr::FontWeight(v), ElementKind::Text(t)) => set(&mut t.weight, *v),
            (Attr::Italic(v), ElementKind::Text(t)) => set(&mut t.italic, *v),
            (Attr::Underline(v), ElementKind::Text(t)) => set(&mut t.underline, *v),
            (Attr::Align(v), ElementKind::Text(t)) => set(&mut t.align, *v),

            (Attr::Shape(v), ElementKind::Shape(s)) => set(&mut s.shape, *v),
            (Attr::Fill(v), ElementKind::Shape(s)) => set(&mut s.fill, *v),
            (Attr::CornerRadius(v), ElementKind::Shape(s)) => set(&mut s.corner_radius, *v),

            (Attr::StrokeColor(v), ElementKind::Line(s) | ElementKind::Arrow(s)) => {
                set(&mut s.color, *v)
            }
            (Attr::StrokeWidth(v), ElementKind::Line(s) | ElementKind::Arrow(s)) => {
                set(&mut s.width, *v)
            }
            (Attr::StrokeColor(v), ElementKind::Freehand(f)) => set(&mut f.color, *v),
            (Attr::StrokeWidth(v), ElementKind::Freehand(f)) => set(&mut f.width, *v),

            (Attr::Src(v), ElementKind::Image(i)) => set(&mut i.src, v.clone()),
            (Attr::Blur(v), ElementKind::Image(i)) => set(&mut i.filters.blur, *v),
            (Attr::Brightness(v), ElementKind::Image(i)) => set(&mut i.filters.brightness, *v),
            (Attr::Contrast(v), ElementKind::Image(i)) => set(&mut i.filters.contrast, *v),

            _ => false,
        };
        if applied {
            self.normalize();
        }
        applied
    }
}

fn set<T>(slot: &mut T, value: T) -> bool {
    *slot = value;
    true
}

// ─── Element specs ───────────────────────────────────────────────────────

/// Everything needed to add an element except the id and z-index, which the
/// scene store assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub opacity: f32,
    pub kind: ElementKind,
}

impl ElementSpec {
    pub fn new(kind: ElementKind, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
            opacity: 1.0,
            kind,
        }
    }

    /// Default text box (200 × 40) at `(x, y)`.
    pub fn text(content: impl Into<String>, x: f32, y: f32) -> Self {
        let style = TextStyle {
            content: content.into(),
            ..TextStyle::default()
        };
        Self::new(ElementKind::Text(style), x, y, 200.0, 40.0)
    }

    /// Default 100 × 100 shape at `(x, y)`.
    pub fn shape(shape: ShapeKind, x: f32, y: f32) -> Self {
        let attrs = ShapeAttrs {
            shape,
            ..ShapeAttrs::default()
        };
        Self::new(ElementKind::Shape(attrs), x, y, 100.0, 100.0)
    }

    pub fn image(src: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        let attrs = ImageAttrs {
            src: src.into(),
            filters: ImageFilters::default(),
        };
        Self::new(ElementKind::Image(attrs), x, y, width, height)
    }

    /// Horizontal line of the given length; the box height is the hit band.
    pub fn line(x: f32, y: f32, length: f32) -> Self {
        Self::new(ElementKind::Line(StrokeAttrs::default()), x, y, length, 20.0)
    }

    pub fn arrow(x: f32, y: f32, length: f32) -> Self {
        Self::new(ElementKind::Arrow(StrokeAttrs::default()), x, y, length, 20.0)
    }

    /// Freehand polyline from absolute canvas points. The bounding box is
    /// fitted to the points and the points are stored relative to it.
    pub fn freehand(points: &[(f32, f32)], color: Color, width: f32) -> Self {
        let (min_x, min_y, max_x, max_y) = points.iter().fold(
            (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
            |(ax, ay, bx, by), &(x, y)| (ax.min(x), ay.min(y), bx.max(x), by.max(y)),
        );
        let (min_x, min_y, max_x, max_y) = if points.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            (min_x, min_y, max_x, max_y)
        };
        let attrs = FreehandAttrs {
            points: points.iter().map(|&(x, y)| (x - min_x, y - min_y)).collect(),
            color,
            width,
        };
        Self::new(
            ElementKind::Freehand(attrs),
            min_x,
            min_y,
            max_x - min_x,
            max_y - min_y,
        )
    }
}
