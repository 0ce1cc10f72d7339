//! Integration tests: scene store operations against the snapshot history.
//!
//! Exercises the store through its public API only: every structural
//! operation is one undo step, undo/redo restore exact states, and a new
//! commit after undo discards the redo branch.

use pretty_assertions::assert_eq;
use tpl_core::*;

fn store() -> SceneStore {
    SceneStore::new(&EditorConfig::default())
}

fn elements(store: &SceneStore) -> Vec<Element> {
    store.elements().to_vec()
}

/// A mixed sequence of commit-producing operations.
fn run_mixed_ops(s: &mut SceneStore) -> usize {
    let text = s.add_element(ElementSpec::text("Hello", 100.0, 100.0));
    let star = s.add_element(ElementSpec::shape(ShapeKind::Star, 10.0, 10.0));
    let line = s.add_element(ElementSpec::line(0.0, 300.0, 150.0));
    s.update_element(text, &[Attr::FontSize(32.0), Attr::Italic(true)]);
    s.update_element(star, &[Attr::Fill(Color::rgb(255, 0, 0))]);
    s.duplicate_element(star);
    s.reorder(text, ZOrder::Up);
    s.delete_element(line);
    s.set_canvas_size(Size::new(1024.0, 768.0));
    9
}

// ─── Undo / redo ────────────────────────────────────────────────────────

#[test]
fn undo_n_times_restores_initial_state() {
    let mut s = store();
    let initial = s.scene().clone();
    let n = run_mixed_ops(&mut s);
    assert_eq!(s.history().len(), n + 1);

    for _ in 0..n {
        assert!(s.undo());
    }
    assert_eq!(s.scene(), &initial);
    assert!(!s.undo(), "undo past the first snapshot must be a no-op");
    assert_eq!(s.scene(), &initial);
}

#[test]
fn redo_after_undo_restores_pre_undo_state() {
    let mut s = store();
    run_mixed_ops(&mut s);
    let before = s.scene().clone();

    for _ in 0..3 {
        s.undo();
    }
    for _ in 0..3 {
        assert!(s.redo());
    }
    assert_eq!(s.scene(), &before);
    assert!(!s.redo(), "redo at the newest snapshot must be a no-op");
}

#[test]
fn commit_after_undo_discards_redo_branch() {
    let mut s = store();
    let a = s.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    s.update_element(a, &[Attr::X(40.0)]);
    s.undo();
    assert!(s.can_redo());

    s.update_element(a, &[Attr::Y(70.0)]);
    assert!(!s.can_redo());
    assert!(!s.redo());
    let el = s.get(a).unwrap();
    assert_eq!((el.x, el.y), (0.0, 70.0));
}

#[test]
fn cosmetic_operations_never_commit() {
    let mut s = store();
    let a = s.add_element(ElementSpec::text("a", 0.0, 0.0));
    let len = s.history().len();
    s.set_selection(Some(a));
    s.set_tool(ToolKind::Marquee);
    s.set_marked([a]);
    s.set_selection(None);
    assert_eq!(s.history().len(), len);
    assert_eq!(s.tool(), ToolKind::Marquee);
}

// ─── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn text_add_undo_redo_scenario() {
    let mut s = store();
    let id = s.add_element(ElementSpec::text("Double click to edit", 100.0, 100.0));
    let added = s.get(id).cloned().unwrap();
    assert_eq!(
        (added.x, added.y, added.width, added.height),
        (100.0, 100.0, 200.0, 40.0)
    );

    assert!(s.undo());
    assert!(s.elements().is_empty());

    assert!(s.redo());
    assert_eq!(elements(&s), vec![added]);
    assert_eq!(s.elements()[0].id, id);
}

#[test]
fn reorder_up_ties_with_former_top() {
    let mut s = store();
    let ids: Vec<ElementId> = [ShapeKind::Rectangle, ShapeKind::Circle, ShapeKind::Triangle]
        .into_iter()
        .map(|k| s.add_element(ElementSpec::shape(k, 0.0, 0.0)))
        .collect();
    let z: Vec<u32> = ids.iter().map(|id| s.get(*id).unwrap().z_index).collect();
    assert_eq!(z, vec![0, 1, 2]);

    assert!(s.reorder(ids[1], ZOrder::Up));
    assert_eq!(s.get(ids[1]).unwrap().z_index, 2);

    // Tie at z=2 is broken by insertion order: middle before former top.
    let order: Vec<ElementId> = s.scene().paint_order().iter().map(|e| e.id).collect();
    assert_eq!(order, vec![ids[0], ids[1], ids[2]]);
}

#[test]
fn reorder_down_at_zero_leaves_z_unchanged() {
    let mut s = store();
    let a = s.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    assert!(!s.reorder(a, ZOrder::Down));
    assert_eq!(s.get(a).unwrap().z_index, 0);
}

#[test]
fn duplicate_differs_only_in_id_position_and_z() {
    let mut s = store();
    let a = s.add_element(ElementSpec::image("data:image/png;base64,AA==", 5.0, 6.0, 40.0, 30.0));
    s.update_element(a, &[Attr::Rotation(45.0), Attr::Opacity(0.5), Attr::Blur(2.0)]);
    s.add_element(ElementSpec::arrow(0.0, 0.0, 80.0));
    let copy_id = s.duplicate_element(a).unwrap();

    let original = s.get(a).cloned().unwrap();
    let copy = s.get(copy_id).cloned().unwrap();
    assert_ne!(copy.id, original.id);
    assert_eq!((copy.x, copy.y), (original.x + 20.0, original.y + 20.0));
    assert_eq!(copy.z_index, s.scene().top_z().unwrap());
    assert!(s.elements().iter().filter(|e| e.id != copy_id).all(|e| e.z_index < copy.z_index));

    let normalized = Element {
        id: original.id,
        x: original.x,
        y: original.y,
        z_index: original.z_index,
        ..copy
    };
    assert_eq!(normalized, original);
}

#[test]
fn stale_ids_are_silent_noops() {
    let mut s = store();
    let a = s.add_element(ElementSpec::text("a", 0.0, 0.0));
    s.delete_element(a);
    let len = s.history().len();

    assert!(!s.update_element(a, &[Attr::X(1.0)]));
    assert!(!s.delete_element(a));
    assert_eq!(s.duplicate_element(a), None);
    assert!(!s.reorder(a, ZOrder::Up));
    assert!(!s.set_selection(Some(a)));
    assert_eq!(s.history().len(), len);
}

// ─── Capacity ───────────────────────────────────────────────────────────

#[test]
fn bounded_history_keeps_newest_snapshots() {
    let config = EditorConfig::from_json(r#"{ "history": { "capacity": 3 } }"#).unwrap();
    let mut s = SceneStore::new(&config);
    let a = s.add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    for x in 1..=5 {
        s.update_element(a, &[Attr::X(x as f32)]);
    }
    assert_eq!(s.history().len(), 3);
    assert!(s.undo());
    assert!(s.undo());
    assert!(!s.undo());
    assert_eq!(s.get(a).unwrap().x, 3.0);
}
