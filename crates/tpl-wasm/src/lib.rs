//! WASM bridge for the template editor — exposes the Rust editor to the
//! storefront's JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host owns the `<canvas>`
//! element, forwards pointer events and calls [`TemplateCanvas::render`]
//! whenever a handler reports a change. Keyboard shortcuts are handled by a
//! `keydown` listener that exists only while the editor is mounted.

mod render2d;

use std::cell::RefCell;
use std::rc::Rc;
use tpl_core::model::{Color, ElementSpec, FontWeight, ShapeKind};
use tpl_core::{EditorConfig, Template, ToolKind};
use tpl_editor::{InputEvent, KeyEvent, Modifiers, PropertyField, PropertyValue, TemplateEditor};
use tpl_render::{DataUrlSource, ExportFormat};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, EventTarget, HtmlElement, KeyboardEvent};

struct Session {
    editor: TemplateEditor,
    /// Called after a key press changed something, so the host re-renders.
    on_change: Option<js_sys::Function>,
}

/// A registered `keydown` listener. Dropping it detaches the listener.
struct KeyListener {
    target: EventTarget,
    callback: Closure<dyn FnMut(KeyboardEvent)>,
}

impl KeyListener {
    fn attach(target: EventTarget, session: &Rc<RefCell<Session>>) -> Result<Self, JsValue> {
        let session = Rc::clone(session);
        let callback = Closure::wrap(Box::new(move |event: KeyboardEvent| {
            let key = KeyEvent {
                key: event.key(),
                modifiers: Modifiers {
                    shift: event.shift_key(),
                    ctrl: event.ctrl_key(),
                    alt: event.alt_key(),
                    meta: event.meta_key(),
                },
                text_input_focused: is_text_field(&event),
            };
            let (changed, on_change) = {
                let mut s = session.borrow_mut();
                let changed = s.editor.handle_event(&InputEvent::Key(key));
                (changed, s.on_change.clone())
            };
            if changed {
                event.prevent_default();
                if let Some(f) = on_change {
                    let _ = f.call0(&JsValue::NULL);
                }
            }
        }) as Box<dyn FnMut(KeyboardEvent)>);
        target.add_event_listener_with_callback("keydown", callback.as_ref().unchecked_ref())?;
        Ok(Self { target, callback })
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback("keydown", self.callback.as_ref().unchecked_ref());
        log::debug!("keydown listener removed");
    }
}

fn is_text_field(event: &KeyboardEvent) -> bool {
    let Some(el) = event.target().and_then(|t| t.dyn_into::<HtmlElement>().ok()) else {
        return false;
    };
    el.is_content_editable() || matches!(el.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT")
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// The JS-facing editor handle.
#[wasm_bindgen]
pub struct TemplateCanvas {
    session: Rc<RefCell<Session>>,
    listener: Option<KeyListener>,
    images: render2d::PreviewImages,
}

#[wasm_bindgen]
impl TemplateCanvas {
    /// Open an editor. `template_json` is an existing template to edit,
    /// `config_json` a partial `EditorConfig`; both optional.
    #[wasm_bindgen(constructor)]
    pub fn new(
        template_json: Option<String>,
        config_json: Option<String>,
        on_save: Option<js_sys::Function>,
        on_close: Option<js_sys::Function>,
    ) -> Result<TemplateCanvas, JsValue> {
        console_error_panic_hook_setup();

        let config = match config_json.as_deref() {
            Some(json) => EditorConfig::from_json(json).map_err(js_err)?,
            None => EditorConfig::default(),
        };
        let template = template_json
            .as_deref()
            .map(Template::from_json)
            .transpose()
            .map_err(js_err)?;

        let mut editor = TemplateEditor::open(template.as_ref(), config).map_err(js_err)?;
        if let Some(f) = on_save {
            editor = editor.on_save(move |t: &Template| match t.to_json() {
                Ok(json) => {
                    let _ = f.call1(&JsValue::NULL, &JsValue::from_str(&json));
                }
                Err(e) => log::error!("could not encode template for save callback: {e}"),
            });
        }
        if let Some(f) = on_close {
            editor = editor.on_close(move || {
                let _ = f.call0(&JsValue::NULL);
            });
        }

        Ok(Self {
            session: Rc::new(RefCell::new(Session { editor, on_change: None })),
            listener: None,
            images: render2d::PreviewImages::new(),
        })
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Start listening for keyboard shortcuts on `window`. `on_change` is
    /// called after a shortcut changed the scene.
    pub fn mount(&mut self, on_change: Option<js_sys::Function>) -> Result<(), JsValue> {
        {
            let mut s = self.session.borrow_mut();
            s.on_change = on_change;
            s.editor.mount();
        }
        if self.listener.is_none() {
            let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
            self.listener = Some(KeyListener::attach(window.into(), &self.session)?);
        }
        Ok(())
    }

    /// Stop listening for keyboard shortcuts.
    pub fn unmount(&mut self) {
        self.listener = None;
        let mut s = self.session.borrow_mut();
        s.editor.unmount();
        s.on_change = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.listener.is_some() && self.session.borrow().editor.controller().is_mounted()
    }

    /// Close the editor without saving and run the close callback.
    pub fn close(self) {
        let TemplateCanvas { session, listener, .. } = self;
        drop(listener);
        match Rc::try_unwrap(session) {
            Ok(cell) => cell.into_inner().editor.close(),
            Err(_) => log::error!("editor still referenced at close"),
        }
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    pub fn render(&mut self, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
        let s = self.session.borrow();
        let editor = &s.editor;
        render2d::render(
            ctx,
            &editor.display_list(),
            editor.layer(),
            &editor.overlay(),
            f64::from(editor.controller().zoom()),
            &mut self.images,
            &DataUrlSource,
        )
    }

    /// Canvas size in CSS pixels at the current zoom, as `[width, height]`.
    pub fn view_size(&self) -> Vec<f64> {
        let s = self.session.borrow();
        let size = s.editor.store().scene().canvas_size();
        let zoom = f64::from(s.editor.controller().zoom());
        vec![f64::from(size.width) * zoom, f64::from(size.height) * zoom]
    }

    // ─── Pointer input ───────────────────────────────────────────────────

    pub fn handle_pointer_down(&mut self, x: f32, y: f32, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let modifiers = Modifiers { shift, ctrl, alt, meta };
        self.dispatch(InputEvent::PointerDown { x, y, modifiers })
    }

    pub fn handle_pointer_move(&mut self, x: f32, y: f32, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let modifiers = Modifiers { shift, ctrl, alt, meta };
        self.dispatch(InputEvent::PointerMove { x, y, modifiers })
    }

    pub fn handle_pointer_up(&mut self, x: f32, y: f32, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let modifiers = Modifiers { shift, ctrl, alt, meta };
        self.dispatch(InputEvent::PointerUp { x, y, modifiers })
    }

    fn dispatch(&mut self, event: InputEvent) -> bool {
        self.session.borrow_mut().editor.handle_event(&event)
    }

    // ─── Tools and view ──────────────────────────────────────────────────

    /// Switch the active tool by name. Returns `false` for unknown names.
    pub fn set_tool(&mut self, name: &str) -> bool {
        match ToolKind::from_name(name) {
            Some(tool) => {
                self.session.borrow_mut().editor.set_tool(tool);
                true
            }
            None => false,
        }
    }

    pub fn get_tool_name(&self) -> String {
        self.session.borrow().editor.store().tool().name().to_string()
    }

    /// Returns the zoom actually applied after clamping.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.session.borrow_mut().editor.controller_mut().set_zoom(zoom)
    }

    pub fn set_brush(&mut self, size: f32, color: &str) -> bool {
        let Some(color) = Color::from_hex(color) else {
            return false;
        };
        let mut s = self.session.borrow_mut();
        let controller = s.editor.controller_mut();
        controller.set_brush_size(size);
        controller.set_brush_color(color);
        true
    }

    /// Current brush color as hex (the eyedropper writes here).
    pub fn get_brush_color(&self) -> String {
        self.session.borrow().editor.controller().brush().color.to_hex()
    }

    pub fn set_shape(&mut self, name: &str) -> bool {
        let shape = match name {
            "rectangle" => ShapeKind::Rectangle,
            "circle" => ShapeKind::Circle,
            "triangle" => ShapeKind::Triangle,
            "star" => ShapeKind::Star,
            _ => return false,
        };
        self.session.borrow_mut().editor.controller_mut().set_shape_kind(shape);
        true
    }

    /// Place an uploaded image (usually a `data:` URL read by the host).
    pub fn add_image(&mut self, src: &str, x: f32, y: f32, width: f32, height: f32) -> u64 {
        let mut s = self.session.borrow_mut();
        let store = s.editor.store_mut();
        let id = store.add_element(ElementSpec::image(src, x, y, width, height));
        store.set_selection(Some(id));
        id.raw()
    }

    /// Register a font face (TTF/OTF bytes) for exports and thumbnails.
    /// The browser canvas preview uses the page's own fonts.
    pub fn register_font(&mut self, family: &str, bold: bool, data: Vec<u8>) -> Result<(), JsValue> {
        let weight = if bold { FontWeight::Bold } else { FontWeight::Normal };
        self.session.borrow_mut().editor.register_font(family, weight, data).map_err(js_err)
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.session.borrow_mut().editor.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.session.borrow_mut().editor.redo()
    }

    pub fn undo_stroke(&mut self) -> bool {
        self.session.borrow_mut().editor.undo_stroke()
    }

    pub fn can_undo(&self) -> bool {
        self.session.borrow().editor.store().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.borrow().editor.store().can_redo()
    }

    // ─── Properties panel ────────────────────────────────────────────────

    /// Properties of the selected element as JSON; `{}` when none.
    pub fn get_selected_props(&self) -> String {
        self.session.borrow().editor.properties().to_string()
    }

    /// Set one property on the selected element. `value_json` is a JSON
    /// number, boolean or string. Returns whether the element changed.
    pub fn set_property(&mut self, key: &str, value_json: &str) -> Result<bool, JsValue> {
        let field = PropertyField::from_name(key).ok_or_else(|| js_err(format!("unknown property `{key}`")))?;
        let value: PropertyValue = serde_json::from_str(value_json).map_err(js_err)?;
        self.session
            .borrow_mut()
            .editor
            .set_property(field, &value)
            .map_err(js_err)
    }

    pub fn bring_forward(&mut self) -> bool {
        let mut s = self.session.borrow_mut();
        let props = s.editor.property_editor();
        props.bring_forward(s.editor.store_mut()).unwrap_or(false)
    }

    pub fn send_backward(&mut self) -> bool {
        let mut s = self.session.borrow_mut();
        let props = s.editor.property_editor();
        props.send_backward(s.editor.store_mut()).unwrap_or(false)
    }

    pub fn duplicate_selected(&mut self) -> bool {
        let mut s = self.session.borrow_mut();
        let props = s.editor.property_editor();
        props.duplicate(s.editor.store_mut()).is_ok()
    }

    pub fn delete_selected(&mut self) -> bool {
        let mut s = self.session.borrow_mut();
        let props = s.editor.property_editor();
        props.delete(s.editor.store_mut()).unwrap_or(false)
    }

    // ─── Save / export / import ──────────────────────────────────────────

    pub fn set_template_name(&mut self, name: &str, category: &str) {
        let mut s = self.session.borrow_mut();
        s.editor.set_name(name);
        s.editor.set_category(category);
    }

    /// Save, invoking the save callback. Returns the template JSON.
    pub fn save(&mut self) -> Result<String, JsValue> {
        let template = self.session.borrow_mut().editor.save();
        template.to_json().map_err(js_err)
    }

    /// Export bytes for download, or `undefined` on failure (a notice is
    /// queued; see [`Self::take_notices`]).
    pub fn export(&mut self, format: &str, quality: f32) -> Option<Vec<u8>> {
        let Some(format) = ExportFormat::from_name(format) else {
            log::warn!("unknown export format `{format}`");
            return None;
        };
        self.session.borrow_mut().editor.export(format, quality)
    }

    /// MIME type for an export format name, for the download blob.
    pub fn export_mime_type(format: &str) -> String {
        ExportFormat::from_name(format)
            .map(|f| f.mime_type().to_string())
            .unwrap_or_default()
    }

    pub fn import_json(&mut self, json: &str) -> bool {
        let imported = self.session.borrow_mut().editor.import_json(json);
        if imported {
            self.images.clear();
        }
        imported
    }

    /// Drain pending user-visible notices as a JSON array of
    /// `{"kind": ..., "message": ...}` objects.
    pub fn take_notices(&mut self) -> String {
        let notices = self.session.borrow_mut().editor.take_notices();
        serde_json::to_string(&notices).unwrap_or_else(|_| "[]".to_string())
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Template editor WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
