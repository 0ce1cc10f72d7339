//! Hit testing: canvas point → element lookup.
//!
//! Walks elements front-to-back (reverse paint order) and tests the point
//! against each element's box in the element's own unrotated frame.

use crate::display::element_transform;
use kurbo::Point;
use tpl_core::model::Bounds;
use tpl_core::{ElementId, Scene};

/// Find the topmost element at canvas position `(px, py)`.
/// Returns `None` over empty canvas.
pub fn hit_test(scene: &Scene, px: f32, py: f32) -> Option<ElementId> {
    let point = Point::new(f64::from(px), f64::from(py));
    scene
        .paint_order()
        .into_iter()
        .rev()
        .find(|el| {
            let local = element_transform(el).inverse() * point;
            el.bounds().contains(local.x as f32, local.y as f32)
        })
        .map(|el| el.id)
}

/// Elements whose bounding box lies fully inside `rect` (edges may touch).
/// Partially overlapping elements are excluded. `rect` may be given with
/// any corner order; it is normalized first. Result is in insertion order.
pub fn contained_in_rect(scene: &Scene, rect: Bounds) -> Vec<ElementId> {
    let area = Bounds::from_corners(rect.x, rect.y, rect.x + rect.width, rect.y + rect.height);
    scene
        .elements()
        .iter()
        .filter(|el| area.contains_bounds(&el.bounds()))
        .map(|el| el.id)
        .collect()
}
