//! CPU rasterizer for export.
//!
//! Paints a [`DisplayList`] and the paint layer into an RGBA buffer sized to
//! the canvas times a scale factor. Coverage is estimated with a 2×2
//! sub-pixel grid per pixel using path winding, which is plenty for print
//! previews and keeps the whole pipeline free of a GPU.

use crate::display::{DisplayList, Primitive, TOLERANCE, paint_layer_primitives};
use crate::export::ExportError;
use crate::source::ImageSource;
use crate::text::{FontBook, TextLayout, layout_text};
use image::{Rgba, RgbaImage, imageops};
use kurbo::{Affine, BezPath, Point, Rect, Shape, Stroke, StrokeOpts};
use tpl_core::PaintLayer;
use tpl_core::model::{Color, ImageFilters, Size};

const SUBSAMPLES: [(f64, f64); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

/// Longest output side JPEG can encode.
pub const MAX_EXPORT_SIDE: u32 = 16_384;
/// Pixel budget for one export (256 MiB of RGBA).
pub const MAX_EXPORT_PIXELS: u64 = 64 * 1024 * 1024;

fn scaled(canvas: Size, scale: f64) -> (f64, f64) {
    let w = (f64::from(canvas.width) * scale).round();
    let h = (f64::from(canvas.height) * scale).round();
    (w.max(0.0), h.max(0.0))
}

/// Output dimensions for a canvas at `scale`: `round(canvas * scale)`.
/// Saturates at `u32::MAX`; [`Rasterizer::new`] rejects anything that large.
pub fn output_size(canvas: Size, scale: f64) -> (u32, u32) {
    let (w, h) = scaled(canvas, scale);
    (w as u32, h as u32)
}

pub struct Rasterizer {
    scale: f64,
    pixmap: RgbaImage,
}

impl Rasterizer {
    /// A white canvas of `round(canvas * scale)` pixels.
    pub fn new(canvas: Size, scale: f64) -> Result<Self, ExportError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ExportError::InvalidQuality(scale as f32));
        }
        let (w, h) = scaled(canvas, scale);
        if w > f64::from(MAX_EXPORT_SIDE) || h > f64::from(MAX_EXPORT_SIDE) || w * h > MAX_EXPORT_PIXELS as f64 {
            return Err(ExportError::TooLarge {
                width: w as u64,
                height: h as u64,
            });
        }
        let (width, height) = output_size(canvas, scale);
        if width == 0 || height == 0 {
            return Err(ExportError::EmptyOutput { width, height });
        }
        Ok(Self {
            scale,
            pixmap: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixmap.dimensions()
    }

    /// Paint every item of the list in order. The first image that fails to
    /// load aborts the paint.
    pub fn paint_display_list(
        &mut self,
        list: &DisplayList,
        source: &dyn ImageSource,
        fonts: &FontBook,
    ) -> Result<(), ExportError> {
        for item in list.items() {
            for primitive in &item.primitives {
                match primitive {
                    Primitive::Fill { path, color } => self.fill_path(path, item.transform, *color, item.opacity),
                    Primitive::Stroke { path, color, style } => {
                        self.stroke_path(path, style, item.transform, *color, item.opacity)
                    }
                    Primitive::Text { rect, style } => match layout_text(fonts, *rect, style) {
                        Some(layout) => self.paint_text(&layout, item.transform, item.opacity),
                        None => log::warn!("text {} has no usable font", item.id),
                    },
                    Primitive::Image { rect, src, filters } => {
                        let pixels = source.load(src)?;
                        let filtered = apply_filters(pixels, filters, self.scale as f32);
                        self.draw_image(&filtered, *rect, item.transform, item.opacity);
                    }
                }
            }
        }
        Ok(())
    }

    /// Paint the freehand layer above everything painted so far.
    pub fn paint_layer(&mut self, layer: &PaintLayer) {
        for primitive in paint_layer_primitives(layer) {
            match primitive {
                Primitive::Fill { path, color } => self.fill_path(&path, Affine::IDENTITY, color, 1.0),
                Primitive::Stroke { path, color, style } => {
                    self.stroke_path(&path, &style, Affine::IDENTITY, color, 1.0)
                }
                _ => {}
            }
        }
    }

    /// Glyphs then underlines, clipped to the element box.
    pub fn paint_text(&mut self, layout: &TextLayout, transform: Affine, opacity: f32) {
        let clip = Some(layout.clip);
        for glyph in layout.outlines() {
            self.fill_clipped(&glyph, transform, layout.color, opacity, clip);
        }
        for bar in &layout.decorations {
            self.fill_clipped(&bar.to_path(TOLERANCE), transform, layout.color, opacity, clip);
        }
    }

    /// Fill `path` (canvas space, then `transform`) with nonzero winding.
    pub fn fill_path(&mut self, path: &BezPath, transform: Affine, color: Color, opacity: f32) {
        self.fill_clipped(path, transform, color, opacity, None);
    }

    fn fill_clipped(&mut self, path: &BezPath, transform: Affine, color: Color, opacity: f32, clip: Option<Rect>) {
        let alpha = color.alpha() * opacity;
        if alpha <= 0.0 {
            return;
        }
        let to_device = Affine::scale(self.scale) * transform;
        let device = to_device * path.clone();
        let clip = clip.map(|r| to_device * r.to_path(TOLERANCE));
        let mut bbox = device.bounding_box();
        if let Some(c) = &clip {
            bbox = bbox.intersect(c.bounding_box());
        }
        let Some((x0, y0, x1, y1)) = self.pixel_span(bbox) else {
            return;
        };
        let covers = |p: Point| device.contains(p) && clip.as_ref().is_none_or(|c| c.contains(p));
        for py in y0..y1 {
            for px in x0..x1 {
                let hits = SUBSAMPLES
                    .iter()
                    .filter(|(dx, dy)| covers(Point::new(f64::from(px) + dx, f64::from(py) + dy)))
                    .count();
                if hits > 0 {
                    let coverage = hits as f32 / SUBSAMPLES.len() as f32;
                    blend(self.pixmap.get_pixel_mut(px, py), [color.r, color.g, color.b], alpha * coverage);
                }
            }
        }
    }

    pub fn stroke_path(&mut self, path: &BezPath, style: &Stroke, transform: Affine, color: Color, opacity: f32) {
        let outline = kurbo::stroke(path.iter(), style, &StrokeOpts::default(), TOLERANCE);
        self.fill_path(&outline, transform, color, opacity);
    }

    /// Draw `image` stretched over `rect` (canvas space, then `transform`),
    /// sampling nearest-neighbour.
    pub fn draw_image(&mut self, image: &RgbaImage, rect: Rect, transform: Affine, opacity: f32) {
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 || rect.area() <= 0.0 || opacity <= 0.0 {
            return;
        }
        let to_device = Affine::scale(self.scale) * transform;
        let to_canvas = to_device.inverse();
        let Some((x0, y0, x1, y1)) = self.pixel_span(to_device.transform_rect_bbox(rect)) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                let p = to_canvas * Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
                if !(rect.x0..rect.x1).contains(&p.x) || !(rect.y0..rect.y1).contains(&p.y) {
                    continue;
                }
                let u = (((p.x - rect.x0) / rect.width()) * f64::from(iw)) as u32;
                let v = (((p.y - rect.y0) / rect.height()) * f64::from(ih)) as u32;
                let src = image.get_pixel(u.min(iw - 1), v.min(ih - 1));
                let alpha = f32::from(src[3]) / 255.0 * opacity;
                blend(self.pixmap.get_pixel_mut(px, py), [src[0], src[1], src[2]], alpha);
            }
        }
    }

    pub fn finish(self) -> RgbaImage {
        self.pixmap
    }

    /// Integer pixel range covering `bbox`, clipped to the buffer.
    fn pixel_span(&self, bbox: Rect) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = self.pixmap.dimensions();
        let x0 = bbox.x0.floor().max(0.0);
        let y0 = bbox.y0.floor().max(0.0);
        let x1 = bbox.x1.ceil().min(f64::from(w));
        let y1 = bbox.y1.ceil().min(f64::from(h));
        if !(x0 < x1 && y0 < y1) {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Source-over onto an opaque-or-not destination.
fn blend(dst: &mut Rgba<u8>, src: [u8; 3], alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    for (d, s) in dst.0.iter_mut().zip(src) {
        *d = (f32::from(*d) + (f32::from(s) - f32::from(*d)) * a).round() as u8;
    }
    let da = f32::from(dst[3]) / 255.0;
    dst[3] = ((a + da * (1.0 - a)) * 255.0).round() as u8;
}

/// Apply brightness, contrast, then blur. `scale` converts the blur radius
/// from canvas units to output pixels.
pub fn apply_filters(image: RgbaImage, filters: &ImageFilters, scale: f32) -> RgbaImage {
    if filters.is_identity() {
        return image;
    }
    let mut image = image;
    if filters.brightness != 1.0 || filters.contrast != 1.0 {
        for px in image.pixels_mut() {
            for c in &mut px.0[..3] {
                let v = f32::from(*c) / 255.0 * filters.brightness;
                let v = (v - 0.5) * filters.contrast + 0.5;
                *c = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    }
    let sigma = filters.blur * scale;
    if sigma > 0.0 {
        image = imageops::blur(&image, sigma);
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tpl_core::{BrushTip, EditorConfig, ElementSpec, SceneStore, ShapeKind};

    struct NoImages;

    impl ImageSource for NoImages {
        fn load(&self, src: &str) -> Result<RgbaImage, ExportError> {
            Err(ExportError::BlockedResource(src.to_string()))
        }
    }

    #[test]
    fn output_size_rounds() {
        assert_eq!(output_size(Size::new(800.0, 600.0), 0.5), (400, 300));
        assert_eq!(output_size(Size::new(101.0, 3.0), 0.5), (51, 2));
    }

    #[test]
    fn rejects_bad_scale() {
        assert!(matches!(
            Rasterizer::new(Size::new(10.0, 10.0), 0.0),
            Err(ExportError::InvalidQuality(_))
        ));
        assert!(Rasterizer::new(Size::new(10.0, 10.0), f64::NAN).is_err());
        assert!(matches!(
            Rasterizer::new(Size::new(1.0, 1.0), 0.1),
            Err(ExportError::EmptyOutput { .. })
        ));
    }

    #[test]
    fn rejects_oversized_output() {
        let canvas = Size::new(800.0, 600.0);
        for scale in [1e7, f64::MAX, 30.0] {
            assert!(
                matches!(Rasterizer::new(canvas, scale), Err(ExportError::TooLarge { .. })),
                "scale {scale}"
            );
        }
        // 16000 x 100 is inside both limits.
        assert_eq!(Rasterizer::new(Size::new(160.0, 1.0), 100.0).unwrap().dimensions(), (16_000, 100));
    }

    #[test]
    fn fills_shape_interior() {
        let mut s = SceneStore::new(&EditorConfig::default());
        s.add_element(ElementSpec::shape(ShapeKind::Rectangle, 10.0, 10.0));
        let mut r = Rasterizer::new(s.scene().canvas_size(), 1.0).unwrap();
        r.paint_display_list(&DisplayList::build(s.scene()), &NoImages, &FontBook::new()).unwrap();
        let img = r.finish();
        assert_eq!(img.get_pixel(50, 50), &Rgba([0x3B, 0x82, 0xF6, 255]));
        assert_eq!(img.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn text_is_painted_inside_its_box() {
        let mut s = SceneStore::new(&EditorConfig::default());
        s.add_element(ElementSpec::text("HELLO WORLD", 100.0, 100.0));
        let mut r = Rasterizer::new(s.scene().canvas_size(), 1.0).unwrap();
        r.paint_display_list(&DisplayList::build(s.scene()), &NoImages, &FontBook::new()).unwrap();
        let img = r.finish();
        let element = s.elements()[0].bounds();
        let mut dark_inside = 0;
        for (x, y, px) in img.enumerate_pixels() {
            if px.0[0] < 128 {
                let inside = f64::from(x) >= f64::from(element.x) - 1.0
                    && f64::from(x) <= f64::from(element.x + element.width) + 1.0
                    && f64::from(y) >= f64::from(element.y) - 1.0
                    && f64::from(y) <= f64::from(element.y + element.height) + 1.0;
                assert!(inside, "ink outside the text box at ({x}, {y})");
                dark_inside += 1;
            }
        }
        assert!(dark_inside > 50, "only {dark_inside} dark pixels");
    }

    #[test]
    fn blocked_image_fails_paint() {
        let mut s = SceneStore::new(&EditorConfig::default());
        s.add_element(ElementSpec::image("https://x/y.png", 0.0, 0.0, 10.0, 10.0));
        let mut r = Rasterizer::new(s.scene().canvas_size(), 1.0).unwrap();
        let err = r.paint_display_list(&DisplayList::build(s.scene()), &NoImages, &FontBook::new());
        assert!(matches!(err, Err(ExportError::BlockedResource(_))));
    }

    #[test]
    fn paint_layer_sits_on_top() {
        let mut s = SceneStore::new(&EditorConfig::default());
        s.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
        let mut layer = PaintLayer::new();
        layer.begin_stroke(BrushTip::Pencil, Color::BLACK, 10.0, 20.0, 50.0);
        layer.extend_stroke(80.0, 50.0);
        let mut r = Rasterizer::new(s.scene().canvas_size(), 1.0).unwrap();
        r.paint_display_list(&DisplayList::build(s.scene()), &NoImages, &FontBook::new()).unwrap();
        r.paint_layer(&layer);
        assert_eq!(r.finish().get_pixel(50, 50), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn brightness_and_contrast_identity_is_noop() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([100, 150, 200, 255]));
        let out = apply_filters(img.clone(), &ImageFilters::default(), 1.0);
        assert_eq!(out, img);
    }

    #[test]
    fn brightness_scales_channels() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([100, 200, 50, 255]));
        let filters = ImageFilters {
            brightness: 0.5,
            ..ImageFilters::default()
        };
        assert_eq!(apply_filters(img, &filters, 1.0).get_pixel(0, 0), &Rgba([50, 100, 25, 255]));
    }

    #[test]
    fn zero_contrast_is_mid_grey() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 240, 90, 255]));
        let filters = ImageFilters {
            contrast: 0.0,
            ..ImageFilters::default()
        };
        assert_eq!(apply_filters(img, &filters, 1.0).get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
    }
}
