//! Integration tests: editor session lifecycle (open, save, export, import,
//! close) across tpl-core, tpl-render and tpl-editor.

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use tpl_core::{Attr, EditorConfig, ElementSpec, FontWeight, ShapeKind, Template, ToolKind};
use tpl_editor::{InputEvent, Notice, PropertyField, PropertyValue, TemplateEditor};
use tpl_render::vello::Scene;
use tpl_render::{ExportFormat, FontBook, FontError, MemorySource};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open_empty() -> TemplateEditor {
    init_logging();
    TemplateEditor::open(None, EditorConfig::default()).unwrap()
}

#[test]
fn save_invokes_callback_and_keeps_identity() {
    init_logging();
    let saved: Rc<RefCell<Vec<Template>>> = Rc::default();
    let sink = Rc::clone(&saved);
    let mut editor = TemplateEditor::open(None, EditorConfig::default())
        .unwrap()
        .on_save(move |t| sink.borrow_mut().push(t.clone()));
    editor.set_name("Flyer");
    editor.set_category("marketing");
    editor.store_mut().add_element(ElementSpec::shape(ShapeKind::Circle, 10.0, 10.0));

    let first = editor.save();
    assert_eq!(first.name, "Flyer");
    assert_eq!(first.category, "marketing");
    assert_eq!(first.elements.len(), 1);
    assert!(first.thumbnail.as_deref().is_some_and(|t| t.starts_with("data:image/png;base64,")));

    editor.store_mut().add_element(ElementSpec::text("Sale", 0.0, 0.0));
    let second = editor.save();
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.elements.len(), 2);

    let saved = saved.borrow();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1], second);
    assert!(matches!(editor.take_notices().as_slice(), [Notice::Saved(_), Notice::Saved(_)]));
}

#[test]
fn reopen_saved_template() {
    let mut editor = open_empty();
    let id = editor.store_mut().add_element(ElementSpec::arrow(5.0, 5.0, 120.0));
    let template = editor.save();

    let reopened = TemplateEditor::open(Some(&template), EditorConfig::default()).unwrap();
    assert_eq!(reopened.store().elements(), template.elements.as_slice());
    assert_eq!(reopened.store().get(id).map(|e| e.z_index), Some(0));
    assert!(!reopened.store().can_undo());
    assert_ne!(reopened.store().session(), editor.store().session());
    assert_eq!(reopened.meta().id.as_deref(), Some(template.id.as_str()));
}

#[test]
fn close_runs_callback_without_saving() {
    init_logging();
    let closed = Rc::new(RefCell::new(false));
    let saves = Rc::new(RefCell::new(0));
    let (c, s) = (Rc::clone(&closed), Rc::clone(&saves));
    let mut editor = TemplateEditor::open(None, EditorConfig::default())
        .unwrap()
        .on_save(move |_| *s.borrow_mut() += 1)
        .on_close(move || *c.borrow_mut() = true);
    editor.mount();
    editor.store_mut().add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    editor.close();
    assert!(*closed.borrow());
    assert_eq!(*saves.borrow(), 0);
}

#[test]
fn export_png_at_quality() {
    let mut editor = open_empty();
    editor.store_mut().add_element(ElementSpec::shape(ShapeKind::Star, 100.0, 100.0));
    let bytes = editor.export(ExportFormat::Png, 2.0).unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (1600, 1200));
    assert!(editor.take_notices().is_empty());
}

#[test]
fn failed_export_raises_notice_and_keeps_scene() {
    let mut editor = open_empty();
    editor
        .store_mut()
        .add_element(ElementSpec::image("https://cdn.example.com/logo.png", 0.0, 0.0, 100.0, 100.0));
    let before = editor.store().scene().clone();
    let history = editor.store().history().len();

    assert!(editor.export(ExportFormat::Pdf, 1.0).is_none());
    assert_eq!(editor.store().scene(), &before);
    assert_eq!(editor.store().history().len(), history);
    let notices = editor.take_notices();
    assert!(matches!(notices.as_slice(), [Notice::ExportFailed(m)] if m.contains("image")));
    assert!(editor.take_notices().is_empty());
}

#[test]
fn export_with_host_images() {
    init_logging();
    let mut images = MemorySource::new();
    images.insert("upload://1", image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255])));
    let mut editor = TemplateEditor::open(None, EditorConfig::default())
        .unwrap()
        .with_image_source(images);
    editor
        .store_mut()
        .add_element(ElementSpec::image("upload://1", 0.0, 0.0, 800.0, 600.0));
    let bytes = editor.export(ExportFormat::Png, 0.5).unwrap();
    let img = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (400, 300));
    assert_eq!(img.get_pixel(200, 150).0, [255, 0, 0, 255]);
}

#[test]
fn import_rejects_invalid_and_keeps_scene() {
    let mut editor = open_empty();
    editor.store_mut().add_element(ElementSpec::shape(ShapeKind::Rectangle, 0.0, 0.0));
    let before = editor.store().scene().clone();

    assert!(!editor.import_json("{ not json"));
    assert!(!editor.import_json(
        r#"{"id":"t","name":"x","elements":[],"canvasSize":{"width":0,"height":600}}"#
    ));
    assert_eq!(editor.store().scene(), &before);
    let notices = editor.take_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| matches!(n, Notice::InvalidTemplate(_))));
}

#[test]
fn import_replaces_scene() {
    let mut editor = open_empty();
    editor.set_tool(ToolKind::Brush);
    editor.handle_event(&InputEvent::pointer_down(1.0, 1.0));
    editor.handle_event(&InputEvent::pointer_up(1.0, 1.0));
    assert!(!editor.layer().is_empty());

    let json = r##"{
        "id": "card-1",
        "name": "Card",
        "category": "cards",
        "canvasSize": { "width": 500, "height": 300 },
        "createdAt": "2024-05-01T12:00:00Z",
        "elements": [
            { "id": 7, "type": "shape", "shape": "circle", "fill": "#FF0000",
              "x": 10, "y": 20, "width": 50, "height": 50, "zIndex": 3 }
        ]
    }"##;
    assert!(editor.import_json(json));
    assert!(editor.layer().is_empty());
    assert_eq!(editor.store().tool(), ToolKind::Move);
    assert_eq!(editor.store().scene().canvas_size().width, 500.0);
    assert_eq!(editor.store().elements()[0].z_index, 3);
    assert_eq!(editor.meta().name, "Card");
    assert_eq!(editor.meta().id.as_deref(), Some("card-1"));
}

#[test]
fn property_edits_are_undoable() {
    let mut editor = open_empty();
    let id = editor.store_mut().add_element(ElementSpec::text("Hello", 0.0, 0.0));
    editor.store_mut().set_selection(Some(id));

    assert_eq!(editor.set_property(PropertyField::Content, &"Bonjour".into()), Ok(true));
    assert_eq!(editor.set_property(PropertyField::Rotation, &PropertyValue::Number(-90.0)), Ok(true));
    let panel = editor.properties();
    assert_eq!(panel["content"], "Bonjour");
    assert_eq!(panel["rotation"], 270.0);

    assert!(editor.undo());
    assert_eq!(editor.properties()["rotation"], 0.0);
    assert!(editor.undo());
    assert_eq!(editor.properties()["content"], "Hello");
}

// ─── Undo through the session ───────────────────────────────────────────

fn drag_rect(editor: &mut TemplateEditor) -> tpl_core::ElementId {
    let id = editor.store_mut().add_element(ElementSpec::shape(ShapeKind::Rectangle, 100.0, 100.0));
    editor.handle_event(&InputEvent::pointer_down(150.0, 150.0));
    editor.handle_event(&InputEvent::pointer_move(170.0, 160.0));
    editor.handle_event(&InputEvent::pointer_move(200.0, 190.0));
    id
}

#[test]
fn undo_after_drag_restores_position() {
    let mut editor = open_empty();
    let id = drag_rect(&mut editor);
    editor.handle_event(&InputEvent::pointer_up(200.0, 190.0));
    let position = |e: &TemplateEditor| e.store().get(id).map(|el| (el.x, el.y));
    assert_eq!(position(&editor), Some((150.0, 140.0)));

    assert!(editor.undo());
    assert_eq!(position(&editor), Some((100.0, 100.0)));
    assert!(editor.redo());
    assert_eq!(position(&editor), Some((150.0, 140.0)));
}

#[test]
fn undo_mid_drag_ends_the_drag() {
    let mut editor = open_empty();
    let id = drag_rect(&mut editor);
    let steps = editor.store().history().len();

    assert!(editor.undo());
    assert!(!editor.store().in_gesture());
    assert_eq!(editor.store().get(id).map(|el| (el.x, el.y)), Some((100.0, 100.0)));

    // The pointer keeps moving but the drag is over.
    assert!(!editor.handle_event(&InputEvent::pointer_move(300.0, 300.0)));
    editor.handle_event(&InputEvent::pointer_up(300.0, 300.0));
    assert_eq!(editor.store().get(id).map(|el| (el.x, el.y)), Some((100.0, 100.0)));
    assert_eq!(editor.store().history().len(), steps + 1);
    assert!(editor.redo());
    assert_eq!(editor.store().get(id).map(|el| (el.x, el.y)), Some((150.0, 140.0)));
}

// ─── Text and fonts ─────────────────────────────────────────────────────

#[test]
fn exported_text_is_visible() {
    let mut editor = open_empty();
    let id = editor.store_mut().add_element(ElementSpec::text("HELLO WORLD", 100.0, 100.0));
    editor.store_mut().update_element(id, &[Attr::FontSize(40.0), Attr::Width(400.0), Attr::Height(60.0)]);
    let bytes = editor.export(ExportFormat::Png, 1.0).unwrap();
    let img = image::load_from_memory(&bytes).unwrap().to_rgba8();
    let dark = img
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[..3].iter().all(|c| *c < 100))
        .map(|(x, y, _)| (x, y))
        .collect::<Vec<_>>();
    assert!(dark.len() > 500, "only {} dark pixels", dark.len());
    assert!(dark.iter().all(|&(x, y)| (99..=501).contains(&x) && (99..=161).contains(&y)));
}

#[test]
fn huge_export_quality_raises_notice() {
    let mut editor = open_empty();
    editor.store_mut().add_element(ElementSpec::text("Big", 0.0, 0.0));
    assert!(editor.export(ExportFormat::Jpeg, 1e7).is_none());
    let notices = editor.take_notices();
    assert!(matches!(notices.as_slice(), [Notice::ExportFailed(m)] if m.contains("too large")));
}

#[test]
fn fonts_are_registered_per_session() {
    let mut editor = open_empty();
    let bold = FontBook::new().resolve("DejaVu Sans", FontWeight::Bold).data.data().to_vec();
    editor.register_font("Brand", FontWeight::Normal, bold).unwrap();
    assert!(editor.fonts().families().contains(&"Brand"));
    assert!(matches!(
        editor.register_font("Broken", FontWeight::Normal, vec![0; 16]),
        Err(FontError::Unreadable { .. })
    ));
}

#[test]
fn paint_draws_text_as_glyphs() {
    let mut editor = open_empty();
    let id = editor.store_mut().add_element(ElementSpec::text("Hi", 10.0, 10.0));
    editor.store_mut().set_selection(Some(id));
    editor.controller_mut().set_zoom(2.0);

    let mut scene = Scene::new();
    editor.paint(&mut scene);
    let resources = &scene.encoding().resources;
    assert_eq!(resources.glyph_runs.len(), 1);
    assert_eq!(resources.glyphs.len(), 2);
}
