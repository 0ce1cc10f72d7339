//! Integration tests: pointer and keyboard interaction (tpl-editor ↔ tpl-core).
//!
//! Drives the interaction controller with raw input events and checks the
//! resulting scene, selection and undo history.

use pretty_assertions::assert_eq;
use tpl_core::config::HistoryConfig;
use tpl_core::{EditorConfig, ElementSpec, PaintLayer, SceneStore, ShapeKind, ToolKind};
use tpl_editor::{InputEvent, InteractionController, KeyEvent, Modifiers};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Harness {
    ctl: InteractionController,
    store: SceneStore,
    layer: PaintLayer,
}

impl Harness {
    fn new(config: EditorConfig) -> Self {
        init_logging();
        Self {
            ctl: InteractionController::new(&config),
            store: SceneStore::new(&config),
            layer: PaintLayer::new(),
        }
    }

    fn event(&mut self, event: InputEvent) -> bool {
        self.ctl.handle_event(&mut self.store, &mut self.layer, &event)
    }

    fn key(&mut self, key: KeyEvent) -> bool {
        self.ctl.handle_key(&mut self.store, &mut self.layer, &key)
    }

    fn drag(&mut self, from: (f32, f32), to: &[(f32, f32)]) {
        self.event(InputEvent::pointer_down(from.0, from.1));
        for &(x, y) in to {
            self.event(InputEvent::pointer_move(x, y));
        }
        let last = to.last().copied().unwrap_or(from);
        self.event(InputEvent::pointer_up(last.0, last.1));
    }
}

fn cmd(key: &str) -> KeyEvent {
    KeyEvent::new(
        key,
        Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        },
    )
}

// ─── Move tool ──────────────────────────────────────────────────────────

#[test]
fn drag_is_one_undo_step() {
    let mut h = Harness::new(EditorConfig::default());
    let id = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 100.0, 100.0));
    let steps = h.store.history().len();

    h.drag((150.0, 150.0), &[(160.0, 150.0), (170.0, 160.0), (200.0, 180.0)]);
    let el = h.store.get(id).unwrap();
    assert_eq!((el.x, el.y), (150.0, 130.0));
    assert_eq!(h.store.selection().primary(), Some(id));
    assert_eq!(h.store.history().len(), steps + 1);

    assert!(h.store.undo());
    let el = h.store.get(id).unwrap();
    assert_eq!((el.x, el.y), (100.0, 100.0));
}

#[test]
fn unbatched_drag_commits_every_move() {
    let config = EditorConfig {
        history: HistoryConfig {
            batch_gestures: false,
            ..HistoryConfig::default()
        },
        ..EditorConfig::default()
    };
    let mut h = Harness::new(config);
    let id = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    let steps = h.store.history().len();

    h.drag((10.0, 10.0), &[(20.0, 10.0), (30.0, 10.0), (40.0, 10.0)]);
    assert_eq!(h.store.history().len(), steps + 3);
    h.store.undo();
    assert_eq!(h.store.get(id).unwrap().x, 20.0);
}

#[test]
fn drag_respects_zoom() {
    let mut h = Harness::new(EditorConfig::default());
    let id = h.store.add_element(ElementSpec::shape(ShapeKind::Circle, 100.0, 100.0));
    h.ctl.set_zoom(2.0);
    // Screen (250, 250) is canvas (125, 125), inside the circle's box.
    h.drag((250.0, 250.0), &[(350.0, 250.0)]);
    assert_eq!(h.store.get(id).unwrap().x, 150.0);
}

#[test]
fn click_on_empty_canvas_deselects() {
    let mut h = Harness::new(EditorConfig::default());
    let id = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    h.store.set_selection(Some(id));
    let steps = h.store.history().len();
    h.drag((500.0, 500.0), &[]);
    assert!(h.store.selection().is_empty());
    assert_eq!(h.store.history().len(), steps);
}

#[test]
fn topmost_element_wins_the_hit() {
    let mut h = Harness::new(EditorConfig::default());
    let below = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    let above = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 50.0, 50.0));
    h.event(InputEvent::pointer_down(75.0, 75.0));
    assert_eq!(h.store.selection().primary(), Some(above));
    h.event(InputEvent::pointer_up(75.0, 75.0));
    h.event(InputEvent::pointer_down(25.0, 25.0));
    assert_eq!(h.store.selection().primary(), Some(below));
}

// ─── Marquee ────────────────────────────────────────────────────────────

#[test]
fn marquee_marks_contained_elements() {
    let mut h = Harness::new(EditorConfig::default());
    let a = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 10.0, 10.0));
    let b = h.store.add_element(ElementSpec::shape(ShapeKind::Star, 150.0, 10.0));
    let outside = h.store.add_element(ElementSpec::shape(ShapeKind::Circle, 400.0, 400.0));
    h.ctl.set_tool(&mut h.store, &mut h.layer, ToolKind::Marquee);
    let steps = h.store.history().len();

    // Dragged right-to-left: the rectangle is normalized.
    h.event(InputEvent::pointer_down(300.0, 200.0));
    h.event(InputEvent::pointer_move(100.0, 100.0));
    assert!(h.ctl.marquee().is_some());
    assert!(!h.ctl.overlay(&h.store).is_empty());
    h.event(InputEvent::pointer_up(0.0, 0.0));

    assert!(h.ctl.marquee().is_none());
    let marked: Vec<_> = h.store.selection().marked().iter().copied().collect();
    assert_eq!(marked, vec![a, b]);
    assert!(!h.store.selection().is_selected(outside));
    assert_eq!(h.store.history().len(), steps);
}

#[test]
fn escape_cancels_marquee() {
    let mut h = Harness::new(EditorConfig::default());
    h.ctl.mount();
    h.ctl.set_tool(&mut h.store, &mut h.layer, ToolKind::Marquee);
    h.event(InputEvent::pointer_down(0.0, 0.0));
    h.event(InputEvent::pointer_move(50.0, 50.0));
    h.key(KeyEvent::plain("Escape"));
    assert!(h.ctl.marquee().is_none());
}

// ─── Placement and paint ────────────────────────────────────────────────

#[test]
fn text_tool_adds_default_text() {
    let mut h = Harness::new(EditorConfig::default());
    h.ctl.set_tool(&mut h.store, &mut h.layer, ToolKind::Text);
    assert!(h.event(InputEvent::pointer_down(40.0, 60.0)));
    assert_eq!(h.store.elements().len(), 1);
    let el = h.store.selected_element().unwrap();
    assert_eq!((el.x, el.y, el.width, el.height), (40.0, 60.0, 200.0, 40.0));
    assert_eq!(el.kind.name(), "text");

    assert!(h.store.undo());
    assert!(h.store.elements().is_empty());
    assert!(h.store.selection().is_empty());
    assert!(h.store.redo());
    assert_eq!(h.store.elements().len(), 1);
}

#[test]
fn shape_tool_uses_current_kind() {
    let mut h = Harness::new(EditorConfig::default());
    h.ctl.set_tool(&mut h.store, &mut h.layer, ToolKind::Shape);
    h.ctl.set_shape_kind(ShapeKind::Triangle);
    h.event(InputEvent::pointer_down(5.0, 5.0));
    let el = h.store.selected_element().unwrap();
    assert!(matches!(&el.kind, tpl_core::ElementKind::Shape(s) if s.shape == ShapeKind::Triangle));
}

#[test]
fn brush_paints_outside_history() {
    let mut h = Harness::new(EditorConfig::default());
    h.ctl.set_tool(&mut h.store, &mut h.layer, ToolKind::Brush);
    h.ctl.set_brush_size(12.0);
    let steps = h.store.history().len();
    h.drag((0.0, 0.0), &[(10.0, 0.0), (20.0, 5.0)]);

    assert_eq!(h.store.history().len(), steps);
    assert!(h.store.elements().is_empty());
    let strokes = h.layer.strokes();
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].size, 12.0);
    assert_eq!(strokes[0].points, vec![(0.0, 0.0), (10.0, 0.0), (20.0, 5.0)]);
}

#[test]
fn pencil_rounds_brush_size() {
    let mut h = Harness::new(EditorConfig::default());
    h.ctl.set_tool(&mut h.store, &mut h.layer, ToolKind::Pencil);
    h.ctl.set_brush_size(0.2);
    h.drag((0.0, 0.0), &[(3.0, 3.0)]);
    assert_eq!(h.layer.strokes()[0].size, 1.0);
}

#[test]
fn inert_tools_do_nothing() {
    let mut h = Harness::new(EditorConfig::default());
    h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    for tool in [ToolKind::Lasso, ToolKind::Crop, ToolKind::Smudge, ToolKind::Upload] {
        h.ctl.set_tool(&mut h.store, &mut h.layer, tool);
        let before = h.store.scene().clone();
        h.drag((50.0, 50.0), &[(80.0, 80.0)]);
        assert_eq!(h.store.scene(), &before);
        assert!(h.layer.is_empty());
    }
}

// ─── Keyboard ───────────────────────────────────────────────────────────

#[test]
fn shortcuts_need_mount_and_no_text_focus() {
    let mut h = Harness::new(EditorConfig::default());
    h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));

    assert!(!h.key(cmd("z")));
    assert_eq!(h.store.elements().len(), 1);

    h.ctl.mount();
    assert!(!h.key(cmd("z").in_text_field()));
    assert_eq!(h.store.elements().len(), 1);
    assert!(h.key(cmd("z")));
    assert!(h.store.elements().is_empty());
    assert!(h.key(cmd("y")));
    assert_eq!(h.store.elements().len(), 1);

    h.ctl.unmount();
    assert!(!h.key(KeyEvent::plain("t")));
    assert_eq!(h.store.tool(), ToolKind::Move);
}

#[test]
fn colliding_keys_pick_later_tool() {
    let mut h = Harness::new(EditorConfig::default());
    h.ctl.mount();
    h.key(KeyEvent::plain("b"));
    assert_eq!(h.store.tool(), ToolKind::Pencil);
    h.key(KeyEvent::plain("u"));
    assert_eq!(h.store.tool(), ToolKind::Shape);
    h.key(KeyEvent::plain("o"));
    assert_eq!(h.store.tool(), ToolKind::Burn);
}

#[test]
fn keyboard_edits_selection() {
    let mut h = Harness::new(EditorConfig::default());
    h.ctl.mount();
    let id = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    h.store.set_selection(Some(id));

    assert!(h.key(KeyEvent::plain("]")));
    assert_eq!(h.store.get(id).unwrap().z_index, 1);
    assert!(h.key(KeyEvent::plain("[")));
    assert!(!h.key(KeyEvent::plain("[")));

    assert!(h.key(cmd("d")));
    let copy = h.store.selection().primary().unwrap();
    assert_ne!(copy, id);
    let c = h.store.get(copy).unwrap();
    assert_eq!((c.x, c.y), (20.0, 20.0));

    assert!(h.key(KeyEvent::plain("Delete")));
    assert!(!h.store.scene().contains(copy));
    assert!(h.store.selection().is_empty());
    assert!(!h.key(KeyEvent::plain("Backspace")));
}

#[test]
fn delete_marked_set_is_one_step() {
    let mut h = Harness::new(EditorConfig::default());
    h.ctl.mount();
    let a = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    let b = h.store.add_element(ElementSpec::shape(ShapeKind::Rectangle, 200.0, 0.0));
    h.store.set_marked([a, b]);
    assert!(h.key(KeyEvent::plain("Delete")));
    assert!(h.store.elements().is_empty());
    assert!(h.store.undo());
    assert_eq!(h.store.elements().len(), 2);
}
