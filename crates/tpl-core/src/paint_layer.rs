//! Persistent freehand paint layer.
//!
//! Brush and pencil strokes are painted onto a layer that sits above the
//! vector elements. They are not elements and are not part of scene
//! history; the layer keeps its own stroke-level undo instead.

use crate::model::Color;
use serde::{Deserialize, Serialize};

/// Tip shape of a paint stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushTip {
    /// Soft round tip.
    Brush,
    /// Hard square tip, at least one unit wide.
    Pencil,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintStroke {
    pub tip: BrushTip,
    pub color: Color,
    pub size: f32,
    /// Canvas-space points in the order they were painted.
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintLayer {
    strokes: Vec<PaintStroke>,
    /// Whether the last stroke is still receiving points.
    painting: bool,
}

impl PaintLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strokes(&self) -> &[PaintStroke] {
        &self.strokes
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    /// Start a new stroke at `(x, y)`.
    pub fn begin_stroke(&mut self, tip: BrushTip, color: Color, size: f32, x: f32, y: f32) {
        let size = match tip {
            BrushTip::Brush => size.max(0.5),
            BrushTip::Pencil => size.round().max(1.0),
        };
        self.strokes.push(PaintStroke {
            tip,
            color,
            size,
            points: vec![(x, y)],
        });
        self.painting = true;
    }

    /// Append a point to the active stroke. Returns `false` when no stroke
    /// is active or the point repeats the previous one.
    pub fn extend_stroke(&mut self, x: f32, y: f32) -> bool {
        if !self.painting {
            return false;
        }
        let Some(stroke) = self.strokes.last_mut() else {
            return false;
        };
        if stroke.points.last() == Some(&(x, y)) {
            return false;
        }
        stroke.points.push((x, y));
        true
    }

    pub fn end_stroke(&mut self) {
        self.painting = false;
    }

    /// Remove the most recent stroke.
    pub fn undo_stroke(&mut self) -> bool {
        self.painting = false;
        self.strokes.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.painting = false;
    }
}
