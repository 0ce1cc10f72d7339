//! Interaction controller: input events → scene store operations.
//!
//! Owns the per-tool gesture state, zoom, brush settings and the keyboard
//! subscription. Pointer events are converted to canvas space by dividing
//! by the zoom factor, routed to the tool matching the store's active tool,
//! and the resulting [`EditOp`]s are applied in order.

use crate::input::{InputEvent, KeyEvent};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::{
    EditOp, EyedropperTool, InertTool, MarqueeTool, MoveTool, PaintTool, ShapeTool, TextTool, Tool,
};
use tpl_core::model::{Attr, Bounds, Color, ShapeKind};
use tpl_core::paint_layer::{BrushTip, PaintLayer};
use tpl_core::{EditorConfig, SceneStore, ToolKind, ZOrder};
use tpl_render::Overlay;

/// Current brush used by the brush and pencil tools.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushSettings {
    pub size: f32,
    pub color: Color,
}

/// Live keyboard registration. Exists only between `mount` and `unmount`;
/// hosts attach their native listener when it is created and detach it when
/// it is handed back.
#[derive(Debug, PartialEq, Eq)]
pub struct KeyboardSubscription {
    id: u64,
}

impl KeyboardSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

pub struct InteractionController {
    shortcuts: ShortcutMap,
    subscription: Option<KeyboardSubscription>,
    next_subscription: u64,
    zoom: f32,
    zoom_min: f32,
    zoom_max: f32,
    brush: BrushSettings,
    move_tool: MoveTool,
    marquee_tool: MarqueeTool,
    brush_tool: PaintTool,
    pencil_tool: PaintTool,
    text_tool: TextTool,
    shape_tool: ShapeTool,
    eyedropper_tool: EyedropperTool,
    inert: InertTool,
    /// Tool whose gesture state is live; used to close it on tool switch.
    last_tool: ToolKind,
}

impl InteractionController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            shortcuts: ShortcutMap::new(),
            subscription: None,
            next_subscription: 1,
            zoom: config.clamp_zoom(config.zoom.initial),
            zoom_min: config.zoom.min,
            zoom_max: config.zoom.max,
            brush: BrushSettings {
                size: config.brush.size,
                color: config.brush.color,
            },
            move_tool: MoveTool::new(),
            marquee_tool: MarqueeTool::new(),
            brush_tool: PaintTool::new(BrushTip::Brush),
            pencil_tool: PaintTool::new(BrushTip::Pencil),
            text_tool: TextTool,
            shape_tool: ShapeTool::default(),
            eyedropper_tool: EyedropperTool,
            inert: InertTool(ToolKind::Lasso),
            last_tool: ToolKind::default(),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Register for keyboard input. Mounting twice keeps the existing
    /// subscription.
    pub fn mount(&mut self) -> &KeyboardSubscription {
        let next = &mut self.next_subscription;
        self.subscription.get_or_insert_with(|| {
            let id = *next;
            *next += 1;
            log::debug!("keyboard subscription {id} registered");
            KeyboardSubscription { id }
        })
    }

    /// Release the keyboard registration, returning it so the host can
    /// detach its listener. Keys are ignored from now on.
    pub fn unmount(&mut self) -> Option<KeyboardSubscription> {
        let sub = self.subscription.take();
        if let Some(s) = &sub {
            log::debug!("keyboard subscription {} released", s.id);
        }
        sub
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn subscription(&self) -> Option<&KeyboardSubscription> {
        self.subscription.as_ref()
    }

    // ─── View and brush state ────────────────────────────────────────────

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom factor, clamped to the configured range. Returns the
    /// value actually applied.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.zoom_min, self.zoom_max);
        }
        self.zoom
    }

    pub fn brush(&self) -> BrushSettings {
        self.brush
    }

    pub fn set_brush_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.brush.size = size;
        }
    }

    pub fn set_brush_color(&mut self, color: Color) {
        self.brush.color = color;
    }

    pub fn shape_kind(&self) -> ShapeKind {
        self.shape_tool.shape
    }

    pub fn set_shape_kind(&mut self, shape: ShapeKind) {
        self.shape_tool.shape = shape;
    }

    pub fn shortcuts(&self) -> &ShortcutMap {
        &self.shortcuts
    }

    /// The live marquee rectangle in canvas space.
    pub fn marquee(&self) -> Option<Bounds> {
        self.marquee_tool.rect()
    }

    pub fn overlay(&self, store: &SceneStore) -> Overlay {
        Overlay::build(store.scene(), store.selection(), self.marquee())
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    /// Switch tools, closing any gesture the previous tool had open.
    pub fn set_tool(&mut self, store: &mut SceneStore, layer: &mut PaintLayer, tool: ToolKind) {
        self.close_gesture(store, layer);
        store.set_tool(tool);
        self.last_tool = tool;
    }

    /// Handle one input event. Returns `true` when anything visible changed.
    pub fn handle_event(&mut self, store: &mut SceneStore, layer: &mut PaintLayer, event: &InputEvent) -> bool {
        match event {
            InputEvent::Key(key) => self.handle_key(store, layer, key),
            pointer => {
                if store.tool() != self.last_tool {
                    self.close_gesture(store, layer);
                    self.last_tool = store.tool();
                }
                let canvas_event = pointer.unzoomed(self.zoom);
                let ops = self.tool_mut(store.tool()).handle(&canvas_event, store.scene());
                let marquee_live = self.marquee_tool.rect().is_some();
                self.apply(store, layer, ops) || marquee_live
            }
        }
    }

    /// Step back one snapshot. A drag or stroke in progress is ended first,
    /// so the tool does not keep moving elements restored by the undo.
    pub fn undo(&mut self, store: &mut SceneStore, layer: &mut PaintLayer) -> bool {
        self.close_gesture(store, layer);
        store.undo()
    }

    pub fn redo(&mut self, store: &mut SceneStore, layer: &mut PaintLayer) -> bool {
        self.close_gesture(store, layer);
        store.redo()
    }

    /// Handle a key press. Ignored while unmounted or while a text field
    /// has focus.
    pub fn handle_key(&mut self, store: &mut SceneStore, layer: &mut PaintLayer, key: &KeyEvent) -> bool {
        if !self.is_mounted() {
            log::trace!("key {:?} ignored: not mounted", key.key);
            return false;
        }
        let Some(action) = self.shortcuts.resolve_event(key) else {
            return false;
        };
        log::debug!("shortcut {:?} → {action:?}", key.key);
        match action {
            ShortcutAction::SetTool(tool) => {
                let changed = store.tool() != tool;
                self.set_tool(store, layer, tool);
                changed
            }
            ShortcutAction::Undo => self.undo(store, layer),
            ShortcutAction::Redo => self.redo(store, layer),
            ShortcutAction::Delete => {
                let ids = store.selection().ids();
                if ids.is_empty() {
                    return false;
                }
                self.close_gesture(store, layer);
                // One undo step for a multi-element delete.
                store.begin_gesture();
                let mut changed = false;
                for id in ids {
                    changed |= store.delete_element(id);
                }
                store.end_gesture();
                changed
            }
            ShortcutAction::Duplicate => match store.selection().primary() {
                Some(id) => match store.duplicate_element(id) {
                    Some(copy) => store.set_selection(Some(copy)),
                    None => false,
                },
                None => false,
            },
            ShortcutAction::SendBackward => self.reorder_selected(store, ZOrder::Down),
            ShortcutAction::BringForward => self.reorder_selected(store, ZOrder::Up),
            ShortcutAction::Deselect => {
                self.marquee_tool.cancel();
                let had = !store.selection().is_empty();
                store.set_selection(None);
                had
            }
        }
    }

    fn reorder_selected(&mut self, store: &mut SceneStore, direction: ZOrder) -> bool {
        store.selection().primary().is_some_and(|id| store.reorder(id, direction))
    }

    fn tool_mut(&mut self, tool: ToolKind) -> &mut dyn Tool {
        match tool {
            ToolKind::Move => &mut self.move_tool,
            ToolKind::Marquee => &mut self.marquee_tool,
            ToolKind::Brush => &mut self.brush_tool,
            ToolKind::Pencil => &mut self.pencil_tool,
            ToolKind::Text => &mut self.text_tool,
            ToolKind::Shape => &mut self.shape_tool,
            ToolKind::Eyedropper => &mut self.eyedropper_tool,
            _ => {
                self.inert = InertTool(tool);
                &mut self.inert
            }
        }
    }

    fn close_gesture(&mut self, store: &mut SceneStore, layer: &mut PaintLayer) {
        let ops = self.tool_mut(self.last_tool).cancel();
        self.apply(store, layer, ops);
    }

    fn apply(&mut self, store: &mut SceneStore, layer: &mut PaintLayer, ops: Vec<EditOp>) -> bool {
        let mut changed = false;
        for op in ops {
            changed |= match op {
                EditOp::BeginGesture => {
                    store.begin_gesture();
                    false
                }
                EditOp::EndGesture => {
                    store.end_gesture();
                    false
                }
                EditOp::Select(id) => {
                    let before = store.selection().clone();
                    store.set_selection(id);
                    *store.selection() != before
                }
                EditOp::Mark(ids) => {
                    store.set_marked(ids);
                    true
                }
                EditOp::MoveTo { id, x, y } => store.update_element(id, &[Attr::X(x), Attr::Y(y)]),
                EditOp::Add(spec) => {
                    let id = store.add_element(spec);
                    store.set_selection(Some(id));
                    true
                }
                EditOp::BeginStroke { tip, x, y } => {
                    layer.begin_stroke(tip, self.brush.color, self.brush.size, x, y);
                    true
                }
                EditOp::ExtendStroke { x, y } => layer.extend_stroke(x, y),
                EditOp::EndStroke => {
                    layer.end_stroke();
                    false
                }
                EditOp::PickColor(color) => {
                    self.brush.color = color;
                    log::debug!("eyedropper picked {}", color.to_hex());
                    false
                }
            };
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use pretty_assertions::assert_eq;
    use tpl_core::ElementSpec;

    fn setup() -> (InteractionController, SceneStore, PaintLayer) {
        let config = EditorConfig::default();
        (InteractionController::new(&config), SceneStore::new(&config), PaintLayer::new())
    }

    #[test]
    fn zoom_is_clamped() {
        let (mut ctl, _, _) = setup();
        assert_eq!(ctl.zoom(), 1.0);
        assert_eq!(ctl.set_zoom(20.0), 8.0);
        assert_eq!(ctl.set_zoom(0.0), 0.1);
        assert_eq!(ctl.set_zoom(f32::NAN), 0.1);
    }

    #[test]
    fn mount_is_idempotent() {
        let (mut ctl, _, _) = setup();
        let first = ctl.mount().id();
        assert_eq!(ctl.mount().id(), first);
        let released = ctl.unmount();
        assert_eq!(released.map(|s| s.id()), Some(first));
        assert!(ctl.unmount().is_none());
        assert_ne!(ctl.mount().id(), first);
    }

    #[test]
    fn pointer_positions_are_unzoomed() {
        let (mut ctl, mut store, mut layer) = setup();
        ctl.set_zoom(2.0);
        ctl.set_tool(&mut store, &mut layer, ToolKind::Shape);
        ctl.handle_event(&mut store, &mut layer, &InputEvent::pointer_down(200.0, 100.0));
        let el = store.selected_element().expect("shape selected");
        assert_eq!((el.x, el.y), (100.0, 50.0));
    }

    #[test]
    fn eyedropper_loads_brush_color() {
        let (mut ctl, mut store, mut layer) = setup();
        store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
        ctl.set_tool(&mut store, &mut layer, ToolKind::Eyedropper);
        ctl.handle_event(&mut store, &mut layer, &InputEvent::pointer_down(50.0, 50.0));
        assert_eq!(ctl.brush().color, Color::rgb(0x3B, 0x82, 0xF6));
    }

    #[test]
    fn switching_tools_ends_paint_stroke() {
        let (mut ctl, mut store, mut layer) = setup();
        ctl.set_tool(&mut store, &mut layer, ToolKind::Brush);
        ctl.handle_event(&mut store, &mut layer, &InputEvent::pointer_down(1.0, 1.0));
        ctl.handle_event(&mut store, &mut layer, &InputEvent::pointer_move(5.0, 5.0));
        assert!(layer.is_painting());
        ctl.set_tool(&mut store, &mut layer, ToolKind::Move);
        assert!(!layer.is_painting());
        assert_eq!(layer.strokes().len(), 1);
    }

    #[test]
    fn keys_ignored_until_mounted() {
        let (mut ctl, mut store, mut layer) = setup();
        let t = KeyEvent::plain("t");
        assert!(!ctl.handle_key(&mut store, &mut layer, &t));
        assert_eq!(store.tool(), ToolKind::Move);
        ctl.mount();
        assert!(ctl.handle_key(&mut store, &mut layer, &t));
        assert_eq!(store.tool(), ToolKind::Text);
        let undo = KeyEvent::new("z", Modifiers { ctrl: true, ..Modifiers::NONE });
        assert!(!ctl.handle_key(&mut store, &mut layer, &undo));
    }
}
