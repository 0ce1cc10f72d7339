//! Canvas2D preview renderer.
//!
//! Draws the shared display list to an HTML `<canvas>` via
//! `CanvasRenderingContext2d`. Unlike the CPU exporter this path can lay out
//! text, because the browser does the shaping. Paths are handed over as SVG
//! path strings through `Path2d`.

use kurbo::{Affine, BezPath, Cap, Join, Rect, Stroke};
use std::collections::HashMap;
use tpl_core::model::{Color, FontWeight, ImageFilters, TextAlign, TextStyle};
use tpl_core::PaintLayer;
use tpl_render::display::{MARQUEE_FILL, SELECTION_COLOR, paint_layer_primitives};
use tpl_render::raster::apply_filters;
use tpl_render::text::{LINE_HEIGHT, wrap_lines};
use tpl_render::{DisplayItem, DisplayList, ImageSource, Overlay, Primitive};
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData, Path2d};

/// Selection dash segment length in screen pixels.
const DASH_PX: f64 = 4.0;
const PLACEHOLDER: &str = "#E5E7EB";

fn css(color: Color) -> String {
    format!("rgba({}, {}, {}, {})", color.r, color.g, color.b, color.alpha())
}

/// Decoded images kept as offscreen canvases so each frame is a plain
/// `drawImage`. Failed loads are remembered and drawn as placeholders.
#[derive(Default)]
pub struct PreviewImages {
    canvases: HashMap<String, Option<HtmlCanvasElement>>,
}

impl PreviewImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.canvases.clear();
    }

    fn get(&mut self, src: &str, filters: &ImageFilters, source: &dyn ImageSource) -> Option<&HtmlCanvasElement> {
        let key = format!("{src}#{filters:?}");
        self.canvases
            .entry(key)
            .or_insert_with(|| match upload(src, filters, source) {
                Ok(canvas) => Some(canvas),
                Err(e) => {
                    log::warn!("preview image unavailable: {e:?}");
                    None
                }
            })
            .as_ref()
    }
}

fn upload(src: &str, filters: &ImageFilters, source: &dyn ImageSource) -> Result<HtmlCanvasElement, JsValue> {
    let pixels = source
        .load(src)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let pixels = apply_filters(pixels, filters, 1.0);
    let (w, h) = pixels.dimensions();
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_width(w);
    canvas.set_height(h);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;
    let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(pixels.as_raw().as_slice()), w, h)?;
    ctx.put_image_data(&data, 0.0, 0.0)?;
    Ok(canvas)
}

/// Draw one frame: white canvas, elements, paint layer, overlay.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails.
pub fn render(
    ctx: &CanvasRenderingContext2d,
    list: &DisplayList,
    layer: &PaintLayer,
    overlay: &Overlay,
    zoom: f64,
    images: &mut PreviewImages,
    source: &dyn ImageSource,
) -> Result<(), JsValue> {
    let view = Affine::scale(zoom);
    let canvas = list.canvas();

    set_transform(ctx, Affine::IDENTITY)?;
    ctx.clear_rect(0.0, 0.0, canvas.width() * zoom, canvas.height() * zoom);
    set_transform(ctx, view)?;
    ctx.set_fill_style_str("#FFFFFF");
    ctx.fill_rect(canvas.x0, canvas.y0, canvas.width(), canvas.height());

    ctx.save();
    ctx.begin_path();
    ctx.rect(canvas.x0, canvas.y0, canvas.width(), canvas.height());
    ctx.clip();
    for item in list.items() {
        draw_item(ctx, item, view, images, source)?;
    }
    set_transform(ctx, view)?;
    ctx.set_global_alpha(1.0);
    for primitive in paint_layer_primitives(layer) {
        draw_primitive(ctx, &primitive, images, source)?;
    }
    ctx.restore();

    draw_overlay(ctx, overlay, view, zoom)
}

fn set_transform(ctx: &CanvasRenderingContext2d, t: Affine) -> Result<(), JsValue> {
    let [a, b, c, d, e, f] = t.as_coeffs();
    ctx.set_transform(a, b, c, d, e, f)
}

fn draw_item(
    ctx: &CanvasRenderingContext2d,
    item: &DisplayItem,
    view: Affine,
    images: &mut PreviewImages,
    source: &dyn ImageSource,
) -> Result<(), JsValue> {
    set_transform(ctx, view * item.transform)?;
    ctx.set_global_alpha(f64::from(item.opacity));
    for primitive in &item.primitives {
        draw_primitive(ctx, primitive, images, source)?;
    }
    Ok(())
}

fn draw_primitive(
    ctx: &CanvasRenderingContext2d,
    primitive: &Primitive,
    images: &mut PreviewImages,
    source: &dyn ImageSource,
) -> Result<(), JsValue> {
    match primitive {
        Primitive::Fill { path, color } => {
            ctx.set_fill_style_str(&css(*color));
            ctx.fill_with_path_2d(&to_path2d(path)?);
        }
        Primitive::Stroke { path, color, style } => {
            apply_stroke(ctx, style)?;
            ctx.set_stroke_style_str(&css(*color));
            ctx.stroke_with_path(&to_path2d(path)?);
            ctx.set_line_dash(&js_sys::Array::new())?;
        }
        Primitive::Text { rect, style } => draw_text(ctx, *rect, style)?,
        Primitive::Image { rect, src, filters } => match images.get(src, filters, source) {
            Some(canvas) => {
                ctx.draw_image_with_html_canvas_element_and_dw_and_dh(
                    canvas,
                    rect.x0,
                    rect.y0,
                    rect.width(),
                    rect.height(),
                )?;
            }
            None => {
                ctx.set_fill_style_str(PLACEHOLDER);
                ctx.fill_rect(rect.x0, rect.y0, rect.width(), rect.height());
            }
        },
    }
    Ok(())
}

fn to_path2d(path: &BezPath) -> Result<Path2d, JsValue> {
    Path2d::new_with_path_string(&path.to_svg())
}

fn apply_stroke(ctx: &CanvasRenderingContext2d, style: &Stroke) -> Result<(), JsValue> {
    ctx.set_line_width(style.width);
    ctx.set_line_cap(match style.start_cap {
        Cap::Butt => "butt",
        Cap::Round => "round",
        Cap::Square => "square",
    });
    ctx.set_line_join(match style.join {
        Join::Bevel => "bevel",
        Join::Miter => "miter",
        Join::Round => "round",
    });
    if !style.dash_pattern.is_empty() {
        let dashes = js_sys::Array::new();
        for d in style.dash_pattern.iter() {
            dashes.push(&JsValue::from_f64(*d));
        }
        ctx.set_line_dash(&dashes)?;
    }
    Ok(())
}

/// Word-wrapped text inside the element box, clipped to it.
fn draw_text(ctx: &CanvasRenderingContext2d, rect: Rect, style: &TextStyle) -> Result<(), JsValue> {
    let size = f64::from(style.font_size);
    let weight = match style.weight {
        FontWeight::Normal => "normal",
        FontWeight::Bold => "bold",
    };
    let slant = if style.italic { "italic" } else { "normal" };
    ctx.save();
    ctx.begin_path();
    ctx.rect(rect.x0, rect.y0, rect.width(), rect.height());
    ctx.clip();
    ctx.set_font(&format!("{slant} {weight} {size}px {}", style.font_family));
    ctx.set_fill_style_str(&css(style.color));
    ctx.set_text_baseline("top");
    let (align, x) = match style.align {
        TextAlign::Left => ("left", rect.x0),
        TextAlign::Center => ("center", rect.center().x),
        TextAlign::Right => ("right", rect.x1),
    };
    ctx.set_text_align(align);

    let line_height = size * LINE_HEIGHT;
    let lines = wrap_lines(&style.content, rect.width(), |s| {
        ctx.measure_text(s).map(|m| m.width()).unwrap_or(0.0)
    });
    for (idx, line) in lines.iter().enumerate() {
        let y = rect.y0 + idx as f64 * line_height;
        if y > rect.y1 {
            break;
        }
        ctx.fill_text(line, x, y)?;
        if style.underline {
            let width = ctx.measure_text(line)?.width();
            let x0 = match style.align {
                TextAlign::Left => x,
                TextAlign::Center => x - width / 2.0,
                TextAlign::Right => x - width,
            };
            ctx.fill_rect(x0, y + size * 1.05, width, (size / 15.0).max(1.0));
        }
    }
    ctx.restore();
    Ok(())
}

fn draw_overlay(ctx: &CanvasRenderingContext2d, overlay: &Overlay, view: Affine, zoom: f64) -> Result<(), JsValue> {
    ctx.set_global_alpha(1.0);
    ctx.set_line_width(1.0 / zoom);
    ctx.set_stroke_style_str(&css(SELECTION_COLOR));
    for (rect, transform) in &overlay.selection {
        set_transform(ctx, view * *transform)?;
        let outline = rect.inflate(2.0 / zoom, 2.0 / zoom);
        ctx.stroke_rect(outline.x0, outline.y0, outline.width(), outline.height());
    }
    if let Some(m) = overlay.marquee {
        set_transform(ctx, view)?;
        let dash = DASH_PX / zoom;
        ctx.set_line_dash(&js_sys::Array::of2(&dash.into(), &dash.into()))?;
        ctx.set_fill_style_str(&css(MARQUEE_FILL));
        ctx.fill_rect(m.x0, m.y0, m.width(), m.height());
        ctx.stroke_rect(m.x0, m.y0, m.width(), m.height());
        ctx.set_line_dash(&js_sys::Array::new())?;
    }
    Ok(())
}
