//! Display list → Vello drawing commands.
//!
//! Paints the on-screen view: white canvas, elements in display-list order,
//! the freehand layer, then the selection/marquee overlay. Zoom is applied
//! through `view`, so the same list serves every zoom level.

use crate::display::{DisplayItem, DisplayList, MARQUEE_FILL, Overlay, Primitive, SELECTION_COLOR, paint_layer_primitives};
use crate::raster::apply_filters;
use crate::source::ImageSource;
use crate::text::{FontBook, TextLayout, layout_text};
use kurbo::{Affine, Rect, Stroke};
use peniko::{Blob, Fill, Image, ImageFormat, Mix};
use std::collections::HashMap;
use std::sync::Arc;
use tpl_core::PaintLayer;
use vello::Scene;

pub fn to_peniko(color: tpl_core::Color) -> peniko::Color {
    peniko::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

/// Decoded images uploaded for painting, keyed by `src`.
#[derive(Default)]
pub struct ImageCache {
    images: HashMap<String, Option<Image>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `src` once; failures are remembered so a blocked image is
    /// not retried every frame.
    fn get(&mut self, src: &str, filters: &tpl_core::ImageFilters, source: &dyn ImageSource) -> Option<&Image> {
        let key = format!("{src}#{filters:?}");
        self.images
            .entry(key)
            .or_insert_with(|| match source.load(src) {
                Ok(pixels) => {
                    let pixels = apply_filters(pixels, filters, 1.0);
                    let (w, h) = pixels.dimensions();
                    Some(Image::new(Blob::new(Arc::new(pixels.into_raw())), ImageFormat::Rgba8, w, h))
                }
                Err(e) => {
                    log::warn!("image unavailable for preview: {e}");
                    None
                }
            })
            .as_ref()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

/// Paint one frame. Call with a freshly-reset `Scene`.
pub fn paint_scene(
    scene: &mut Scene,
    list: &DisplayList,
    layer: &PaintLayer,
    overlay: &Overlay,
    view: Affine,
    images: &mut ImageCache,
    source: &dyn ImageSource,
    fonts: &FontBook,
) {
    scene.fill(Fill::NonZero, view, to_peniko(tpl_core::Color::WHITE), None, &list.canvas());

    // Everything is clipped to the canvas, like the export.
    scene.push_layer(Mix::Clip, 1.0, view, &list.canvas());
    for item in list.items() {
        paint_item(scene, item, view, images, source, fonts);
    }
    for primitive in paint_layer_primitives(layer) {
        paint_primitive(scene, &primitive, view, images, source, fonts);
    }
    scene.pop_layer();

    paint_overlay(scene, overlay, view);
}

fn paint_item(
    scene: &mut Scene,
    item: &DisplayItem,
    view: Affine,
    images: &mut ImageCache,
    source: &dyn ImageSource,
    fonts: &FontBook,
) {
    let transform = view * item.transform;
    let layered = item.opacity < 1.0;
    if layered {
        scene.push_layer(Mix::Normal, item.opacity, transform, &item.rect.inflate(1.0e4, 1.0e4));
    }
    for primitive in &item.primitives {
        paint_primitive(scene, primitive, transform, images, source, fonts);
    }
    if layered {
        scene.pop_layer();
    }
}

fn paint_primitive(
    scene: &mut Scene,
    primitive: &Primitive,
    transform: Affine,
    images: &mut ImageCache,
    source: &dyn ImageSource,
    fonts: &FontBook,
) {
    match primitive {
        Primitive::Fill { path, color } => {
            scene.fill(Fill::NonZero, transform, to_peniko(*color), None, path);
        }
        Primitive::Stroke { path, color, style } => {
            scene.stroke(style, transform, to_peniko(*color), None, path);
        }
        Primitive::Text { rect, style } => match layout_text(fonts, *rect, style) {
            Some(layout) => paint_text(scene, &layout, transform),
            None => log::warn!("no usable font for {:?}", style.font_family),
        },
        Primitive::Image { rect, src, filters } => match images.get(src, filters, source) {
            Some(image) => {
                let sx = rect.width() / f64::from(image.width);
                let sy = rect.height() / f64::from(image.height);
                let placement = Affine::translate((rect.x0, rect.y0)) * Affine::scale_non_uniform(sx, sy);
                scene.draw_image(image, transform * placement);
            }
            None => {
                scene.fill(Fill::NonZero, transform, peniko::Color::from_rgba8(0xE5, 0xE7, 0xEB, 0xFF), None, rect);
            }
        },
    }
}

fn paint_text(scene: &mut Scene, layout: &TextLayout, transform: Affine) {
    let color = to_peniko(layout.color);
    scene.push_layer(Mix::Clip, 1.0, transform, &layout.clip);
    scene
        .draw_glyphs(&layout.font)
        .font_size(layout.font_size)
        .transform(transform)
        .glyph_transform(layout.glyph_transform())
        .brush(color)
        .draw(
            Fill::NonZero,
            layout.glyphs.iter().map(|g| vello::Glyph {
                id: g.id,
                x: g.x as f32,
                y: g.y as f32,
            }),
        );
    for bar in &layout.decorations {
        scene.fill(Fill::NonZero, transform, color, None, bar);
    }
    scene.pop_layer();
}

fn paint_overlay(scene: &mut Scene, overlay: &Overlay, view: Affine) {
    // Hairlines stay one device pixel wide at any zoom.
    let zoom = view.as_coeffs()[0].abs().max(1e-6);
    let hairline = Stroke::new(1.0 / zoom);
    for (rect, transform) in &overlay.selection {
        let outline: Rect = rect.inflate(2.0 / zoom, 2.0 / zoom);
        scene.stroke(&hairline, view * *transform, to_peniko(SELECTION_COLOR), None, &outline);
    }
    if let Some(marquee) = overlay.marquee {
        scene.fill(Fill::NonZero, view, to_peniko(MARQUEE_FILL), None, &marquee);
        let dashed = Stroke::new(1.0 / zoom).with_dashes(0.0, [4.0 / zoom, 4.0 / zoom]);
        scene.stroke(&dashed, view, to_peniko(SELECTION_COLOR), None, &marquee);
    }
}
