//! Scene → display list.
//!
//! Flattens the scene into draw items in paint order. Each item carries the
//! element's rotation as an [`Affine`] about its own center plus one or more
//! primitives in canvas coordinates. Both the Vello painter and the CPU
//! rasterizer consume this list, so the two outputs cannot drift apart.

use kurbo::{Affine, BezPath, Cap, Ellipse, Join, Point, Rect, Shape, Stroke};
use std::f64::consts::{FRAC_PI_2, PI};
use tpl_core::model::{
    Bounds, Color, Element, ElementKind, FreehandAttrs, ImageFilters, ShapeAttrs, ShapeKind, StrokeAttrs,
    TextStyle,
};
use tpl_core::paint_layer::{BrushTip, PaintLayer, PaintStroke};
use tpl_core::{ElementId, Scene, Selection};

/// Flattening tolerance for curves, in canvas units.
pub const TOLERANCE: f64 = 0.1;

const STAR_POINTS: u32 = 5;
const STAR_INNER_RATIO: f64 = 0.5;
const ARROW_SIZE: f64 = 10.0;
const ARROW_ANGLE: f64 = PI / 6.0;

pub const SELECTION_COLOR: Color = Color::rgb(0x1E, 0x90, 0xFF);
pub const MARQUEE_FILL: Color = Color::rgba(0x1E, 0x90, 0xFF, 0x1F);

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Fill { path: BezPath, color: Color },
    Stroke { path: BezPath, color: Color, style: Stroke },
    /// Text is carried through unshaped; painters decide how to lay it out.
    Text { rect: Rect, style: TextStyle },
    Image { rect: Rect, src: String, filters: ImageFilters },
}

/// One element ready to paint.
#[derive(Debug, Clone)]
pub struct DisplayItem {
    pub id: ElementId,
    /// Rotation about the element center; identity when unrotated.
    pub transform: Affine,
    pub opacity: f32,
    /// Unrotated bounding box in canvas space.
    pub rect: Rect,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone)]
pub struct DisplayList {
    canvas: Rect,
    items: Vec<DisplayItem>,
}

impl DisplayList {
    /// Build the list for a scene in ascending z-order (ties keep insertion
    /// order). Fully transparent and zero-area elements produce no item.
    pub fn build(scene: &Scene) -> Self {
        let size = scene.canvas_size();
        let items = scene
            .paint_order()
            .into_iter()
            .filter(|el| el.opacity > 0.0)
            .filter_map(|el| {
                let primitives = element_primitives(el);
                if primitives.is_empty() {
                    return None;
                }
                Some(DisplayItem {
                    id: el.id,
                    transform: element_transform(el),
                    opacity: el.opacity,
                    rect: to_rect(&el.bounds()),
                    primitives,
                })
            })
            .collect();
        Self {
            canvas: Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height)),
            items,
        }
    }

    /// The logical canvas area, origin at zero.
    pub fn canvas(&self) -> Rect {
        self.canvas
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn to_rect(b: &Bounds) -> Rect {
    Rect::new(
        f64::from(b.x),
        f64::from(b.y),
        f64::from(b.right()),
        f64::from(b.bottom()),
    )
}

/// Rotation of an element about its own center.
pub fn element_transform(el: &Element) -> Affine {
    if el.rotation == 0.0 {
        return Affine::IDENTITY;
    }
    let (cx, cy) = el.center();
    Affine::rotate_about(f64::from(el.rotation).to_radians(), Point::new(f64::from(cx), f64::from(cy)))
}

fn element_primitives(el: &Element) -> Vec<Primitive> {
    let rect = to_rect(&el.bounds());
    match &el.kind {
        ElementKind::Text(style) => {
            if rect.area() <= 0.0 || style.content.is_empty() {
                return Vec::new();
            }
            vec![Primitive::Text {
                rect,
                style: style.clone(),
            }]
        }
        ElementKind::Image(img) => {
            if rect.area() <= 0.0 {
                return Vec::new();
            }
            vec![Primitive::Image {
                rect,
                src: img.src.clone(),
                filters: img.filters,
            }]
        }
        ElementKind::Shape(shape) => shape_primitives(rect, shape),
        ElementKind::Line(stroke) => line_primitives(rect, stroke, false),
        ElementKind::Arrow(stroke) => line_primitives(rect, stroke, true),
        ElementKind::Freehand(f) => freehand_primitives(rect, f),
    }
}

// ─── Shapes ──────────────────────────────────────────────────────────────

fn shape_primitives(rect: Rect, attrs: &ShapeAttrs) -> Vec<Primitive> {
    if rect.area() <= 0.0 || attrs.fill.a == 0 {
        return Vec::new();
    }
    vec![Primitive::Fill {
        path: shape_path(rect, attrs),
        color: attrs.fill,
    }]
}

/// Outline of a shape filling `rect`.
pub fn shape_path(rect: Rect, attrs: &ShapeAttrs) -> BezPath {
    match attrs.shape {
        ShapeKind::Rectangle => {
            let radius = f64::from(attrs.corner_radius).min(rect.width().min(rect.height()) / 2.0);
            if radius > 0.0 {
                rect.to_rounded_rect(radius).to_path(TOLERANCE)
            } else {
                rect.to_path(TOLERANCE)
            }
        }
        ShapeKind::Circle => Ellipse::from_rect(rect).to_path(TOLERANCE),
        ShapeKind::Triangle => {
            let mut path = BezPath::new();
            path.move_to((rect.center().x, rect.y0));
            path.line_to((rect.x1, rect.y1));
            path.line_to((rect.x0, rect.y1));
            path.close_path();
            path
        }
        ShapeKind::Star => star_path(rect),
    }
}

fn star_path(rect: Rect) -> BezPath {
    let center = rect.center();
    let (rx_outer, ry_outer) = (rect.width() / 2.0, rect.height() / 2.0);
    let (rx_inner, ry_inner) = (rx_outer * STAR_INNER_RATIO, ry_outer * STAR_INNER_RATIO);
    let step = PI / f64::from(STAR_POINTS);

    let mut path = BezPath::new();
    for i in 0..STAR_POINTS * 2 {
        let angle = step.mul_add(f64::from(i), -FRAC_PI_2);
        let (rx, ry) = if i % 2 == 0 {
            (rx_outer, ry_outer)
        } else {
            (rx_inner, ry_inner)
        };
        let p = Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin());
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path.close_path();
    path
}

// ─── Lines and arrows ────────────────────────────────────────────────────

fn line_primitives(rect: Rect, stroke: &StrokeAttrs, arrowhead: bool) -> Vec<Primitive> {
    if rect.width() <= 0.0 || stroke.width <= 0.0 || stroke.color.a == 0 {
        return Vec::new();
    }
    let y = rect.center().y;
    let (start, tip) = (Point::new(rect.x0, y), Point::new(rect.x1, y));
    let mut segment = BezPath::new();
    segment.move_to(start);
    segment.line_to(tip);

    let width = f64::from(stroke.width);
    let mut out = vec![Primitive::Stroke {
        path: segment,
        color: stroke.color,
        style: Stroke::new(width).with_caps(Cap::Butt),
    }];
    if arrowhead {
        out.push(Primitive::Fill {
            path: arrowhead_path(start, tip, ARROW_SIZE.max(width * 3.0)),
            color: stroke.color,
        });
    }
    out
}

/// Filled triangle with its point at `tip`, aligned with `from → tip`.
pub fn arrowhead_path(from: Point, tip: Point, size: f64) -> BezPath {
    let angle = (tip.y - from.y).atan2(tip.x - from.x);
    let mut path = BezPath::new();
    path.move_to(tip);
    path.line_to((
        tip.x - size * (angle - ARROW_ANGLE).cos(),
        tip.y - size * (angle - ARROW_ANGLE).sin(),
    ));
    path.line_to((
        tip.x - size * (angle + ARROW_ANGLE).cos(),
        tip.y - size * (angle + ARROW_ANGLE).sin(),
    ));
    path.close_path();
    path
}

// ─── Freehand ────────────────────────────────────────────────────────────

fn freehand_primitives(rect: Rect, attrs: &FreehandAttrs) -> Vec<Primitive> {
    if attrs.points.is_empty() || attrs.width <= 0.0 || attrs.color.a == 0 {
        return Vec::new();
    }
    let origin = rect.origin();
    let points: Vec<Point> = attrs
        .points
        .iter()
        .map(|&(x, y)| Point::new(origin.x + f64::from(x), origin.y + f64::from(y)))
        .collect();
    vec![polyline_primitive(&points, attrs.color, f64::from(attrs.width), Cap::Round, Join::Round)]
}

/// Stroke through `points`. A single point becomes a dot of the stroke
/// width shaped by the cap.
fn polyline_primitive(points: &[Point], color: Color, width: f64, cap: Cap, join: Join) -> Primitive {
    if let [p] = points {
        let r = width / 2.0;
        let path = match cap {
            Cap::Round => Ellipse::new(*p, (r, r), 0.0).to_path(TOLERANCE),
            _ => Rect::new(p.x - r, p.y - r, p.x + r, p.y + r).to_path(TOLERANCE),
        };
        return Primitive::Fill { path, color };
    }
    let mut path = BezPath::new();
    for (i, p) in points.iter().enumerate() {
        if i == 0 {
            path.move_to(*p);
        } else {
            path.line_to(*p);
        }
    }
    Primitive::Stroke {
        path,
        color,
        style: Stroke::new(width).with_caps(cap).with_join(join),
    }
}

/// Primitives of the persistent paint layer, oldest stroke first.
pub fn paint_layer_primitives(layer: &PaintLayer) -> Vec<Primitive> {
    layer.strokes().iter().filter_map(stroke_primitive).collect()
}

fn stroke_primitive(stroke: &PaintStroke) -> Option<Primitive> {
    if stroke.points.is_empty() || stroke.color.a == 0 {
        return None;
    }
    let points: Vec<Point> = stroke
        .points
        .iter()
        .map(|&(x, y)| Point::new(f64::from(x), f64::from(y)))
        .collect();
    let (cap, join) = match stroke.tip {
        BrushTip::Brush => (Cap::Round, Join::Round),
        BrushTip::Pencil => (Cap::Square, Join::Miter),
    };
    Some(polyline_primitive(&points, stroke.color, f64::from(stroke.size), cap, join))
}

// ─── Overlay ─────────────────────────────────────────────────────────────

/// Non-persistent decoration drawn over the canvas: selection outlines and
/// the live marquee. Never part of exported output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// Selected element boxes with their rotation.
    pub selection: Vec<(Rect, Affine)>,
    /// Normalized marquee rectangle while a marquee gesture is live.
    pub marquee: Option<Rect>,
}

impl Overlay {
    pub fn build(scene: &Scene, selection: &Selection, marquee: Option<Bounds>) -> Self {
        let selection = selection
            .ids()
            .into_iter()
            .filter_map(|id| scene.get(id))
            .map(|el| (to_rect(&el.bounds()), element_transform(el)))
            .collect();
        Self {
            selection,
            marquee: marquee.map(|b| to_rect(&b)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty() && self.marquee.is_none()
    }
}
