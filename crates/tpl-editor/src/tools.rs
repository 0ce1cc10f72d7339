//! Tool system for canvas interactions.
//!
//! Each tool translates canvas-space input events into `EditOp`s that the
//! controller applies to the scene store and paint layer. Tools hold only
//! gesture state; they never touch the scene directly.
//!
//! | Tool | Pointer down | Pointer move | Pointer up |
//! |------|--------------|--------------|------------|
//! | move | select hit, start drag | move dragged element | end drag |
//! | marquee | anchor rectangle | follow corner | mark contained elements |
//! | brush / pencil | start paint stroke | extend stroke | end stroke |
//! | text / shape | add element at pointer | — | — |
//! | eyedropper | pick color under pointer | — | — |

use crate::input::InputEvent;
use tpl_core::model::{Bounds, Color, ElementKind, ElementSpec, ShapeKind, TextStyle};
use tpl_core::paint_layer::BrushTip;
use tpl_core::{ElementId, Scene, ToolKind};
use tpl_render::hit::{contained_in_rect, hit_test};

/// One change requested by a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    BeginGesture,
    EndGesture,
    Select(Option<ElementId>),
    /// Replace the marked (marquee) set.
    Mark(Vec<ElementId>),
    MoveTo { id: ElementId, x: f32, y: f32 },
    /// Add an element and select it.
    Add(ElementSpec),
    BeginStroke { tip: BrushTip, x: f32, y: f32 },
    ExtendStroke { x: f32, y: f32 },
    EndStroke,
    /// Load a color into the brush.
    PickColor(Color),
}

/// Trait for tools that handle input and produce edit ops.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Handle a canvas-space pointer event.
    fn handle(&mut self, event: &InputEvent, scene: &Scene) -> Vec<EditOp>;

    /// Abandon any in-flight gesture, returning the ops needed to close it.
    fn cancel(&mut self) -> Vec<EditOp> {
        Vec::new()
    }
}

// ─── Move Tool ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    id: ElementId,
    /// Pointer position minus element position at drag start.
    anchor: (f32, f32),
}

#[derive(Debug, Default)]
pub struct MoveTool {
    drag: Option<Drag>,
}

impl MoveTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<ElementId> {
        self.drag.map(|d| d.id)
    }
}

impl Tool for MoveTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Move
    }

    fn handle(&mut self, event: &InputEvent, scene: &Scene) -> Vec<EditOp> {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                let mut ops = self.cancel();
                match hit_test(scene, x, y).and_then(|id| scene.get(id)) {
                    Some(el) => {
                        self.drag = Some(Drag {
                            id: el.id,
                            anchor: (x - el.x, y - el.y),
                        });
                        ops.extend([EditOp::Select(Some(el.id)), EditOp::BeginGesture]);
                    }
                    None => ops.push(EditOp::Select(None)),
                }
                ops
            }
            InputEvent::PointerMove { x, y, .. } => match self.drag {
                Some(Drag { id, anchor }) => vec![EditOp::MoveTo {
                    id,
                    x: x - anchor.0,
                    y: y - anchor.1,
                }],
                None => Vec::new(),
            },
            InputEvent::PointerUp { .. } => self.cancel(),
            InputEvent::Key(_) => Vec::new(),
        }
    }

    fn cancel(&mut self) -> Vec<EditOp> {
        match self.drag.take() {
            Some(_) => vec![EditOp::EndGesture],
            None => Vec::new(),
        }
    }
}

// ─── Marquee Tool ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MarqueeTool {
    start: Option<(f32, f32)>,
    current: (f32, f32),
}

impl MarqueeTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live rectangle, normalized, while a marquee is in progress.
    pub fn rect(&self) -> Option<Bounds> {
        self.start
            .map(|(sx, sy)| Bounds::from_corners(sx, sy, self.current.0, self.current.1))
    }
}

impl Tool for MarqueeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Marquee
    }

    fn handle(&mut self, event: &InputEvent, scene: &Scene) -> Vec<EditOp> {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                self.start = None;
                if let Some(id) = hit_test(scene, x, y) {
                    return vec![EditOp::Select(Some(id))];
                }
                self.start = Some((x, y));
                self.current = (x, y);
                vec![EditOp::Select(None)]
            }
            InputEvent::PointerMove { x, y, .. } => {
                if self.start.is_some() {
                    self.current = (x, y);
                }
                Vec::new()
            }
            InputEvent::PointerUp { x, y, .. } => {
                if self.start.is_none() {
                    return Vec::new();
                }
                self.current = (x, y);
                let ids = self.rect().map(|r| contained_in_rect(scene, r)).unwrap_or_default();
                self.start = None;
                vec![EditOp::Mark(ids)]
            }
            InputEvent::Key(_) => Vec::new(),
        }
    }

    fn cancel(&mut self) -> Vec<EditOp> {
        self.start = None;
        Vec::new()
    }
}

// ─── Paint Tool ──────────────────────────────────────────────────────────

/// Brush and pencil: strokes go to the paint layer, not the scene.
#[derive(Debug)]
pub struct PaintTool {
    tip: BrushTip,
    painting: bool,
}

impl PaintTool {
    pub fn new(tip: BrushTip) -> Self {
        Self { tip, painting: false }
    }
}

impl Tool for PaintTool {
    fn kind(&self) -> ToolKind {
        match self.tip {
            BrushTip::Brush => ToolKind::Brush,
            BrushTip::Pencil => ToolKind::Pencil,
        }
    }

    fn handle(&mut self, event: &InputEvent, _scene: &Scene) -> Vec<EditOp> {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                let mut ops = self.cancel();
                self.painting = true;
                ops.push(EditOp::BeginStroke { tip: self.tip, x, y });
                ops
            }
            InputEvent::PointerMove { x, y, .. } if self.painting => vec![EditOp::ExtendStroke { x, y }],
            InputEvent::PointerUp { .. } => self.cancel(),
            _ => Vec::new(),
        }
    }

    fn cancel(&mut self) -> Vec<EditOp> {
        if std::mem::take(&mut self.painting) {
            vec![EditOp::EndStroke]
        } else {
            Vec::new()
        }
    }
}

// ─── Placement tools ─────────────────────────────────────────────────────

/// Adds a default text box with its top-left corner at the pointer.
#[derive(Debug, Default)]
pub struct TextTool;

impl Tool for TextTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Text
    }

    fn handle(&mut self, event: &InputEvent, _scene: &Scene) -> Vec<EditOp> {
        match *event {
            InputEvent::PointerDown { x, y, .. } => {
                vec![EditOp::Add(ElementSpec::text(TextStyle::default().content, x, y))]
            }
            _ => Vec::new(),
        }
    }
}

/// Adds the current shape kind with its top-left corner at the pointer.
#[derive(Debug, Default)]
pub struct ShapeTool {
    pub shape: ShapeKind,
}

impl Tool for ShapeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Shape
    }

    fn handle(&mut self, event: &InputEvent, _scene: &Scene) -> Vec<EditOp> {
        match *event {
            InputEvent::PointerDown { x, y, .. } => vec![EditOp::Add(ElementSpec::shape(self.shape, x, y))],
            _ => Vec::new(),
        }
    }
}

/// Reads the dominant color of the topmost element under the pointer.
#[derive(Debug, Default)]
pub struct EyedropperTool;

impl Tool for EyedropperTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eyedropper
    }

    fn handle(&mut self, event: &InputEvent, scene: &Scene) -> Vec<EditOp> {
        let InputEvent::PointerDown { x, y, .. } = *event else {
            return Vec::new();
        };
        let color = hit_test(scene, x, y)
            .and_then(|id| scene.get(id))
            .and_then(|el| match &el.kind {
                ElementKind::Text(t) => Some(t.color),
                ElementKind::Shape(s) => Some(s.fill),
                ElementKind::Line(s) | ElementKind::Arrow(s) => Some(s.color),
                ElementKind::Freehand(f) => Some(f.color),
                ElementKind::Image(_) => None,
            });
        color.map(EditOp::PickColor).into_iter().collect()
    }
}

/// Selectable tool identifiers without canvas behavior.
#[derive(Debug)]
pub struct InertTool(pub ToolKind);

impl Tool for InertTool {
    fn kind(&self) -> ToolKind {
        self.0
    }

    fn handle(&mut self, _event: &InputEvent, _scene: &Scene) -> Vec<EditOp> {
        Vec::new()
    }
}
