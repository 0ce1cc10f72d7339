//! Editor session.
//!
//! `TemplateEditor` is what a host opens: it bundles the scene store, the
//! paint layer, the interaction controller and the property editor, and
//! talks back through the save and close callbacks. Failures that the user
//! should see are queued as [`Notice`]s instead of being returned, so a
//! failed export or import never disturbs the scene.

use crate::controller::InteractionController;
use crate::input::InputEvent;
use crate::properties::{PropertyEditor, PropertyError, PropertyField, PropertyValue};
use serde::Serialize;
use tpl_core::template::{self, Template, TemplateError, TemplateMeta};
use tpl_core::{EditorConfig, PaintLayer, SceneStore, ToolKind};
use tpl_core::FontWeight;
use tpl_render::vello::{Scene, kurbo::Affine};
use tpl_render::{
    DataUrlSource, DisplayList, ExportFormat, ExportRequest, FontBook, FontError, ImageCache, ImageSource, Overlay,
};

/// Longest side of the preview embedded in saved templates.
pub const THUMBNAIL_SIZE: u32 = 200;

pub type SaveCallback = Box<dyn FnMut(&Template)>;
pub type CloseCallback = Box<dyn FnOnce()>;

/// A user-visible message raised by the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "kebab-case")]
pub enum Notice {
    Saved(String),
    ExportFailed(String),
    InvalidTemplate(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Saved(m) | Notice::ExportFailed(m) | Notice::InvalidTemplate(m) => m,
        }
    }
}

pub struct TemplateEditor {
    config: EditorConfig,
    store: SceneStore,
    layer: PaintLayer,
    controller: InteractionController,
    properties: PropertyEditor,
    meta: TemplateMeta,
    images: Box<dyn ImageSource>,
    preview: ImageCache,
    fonts: FontBook,
    on_save: Option<SaveCallback>,
    on_close: Option<CloseCallback>,
    notices: Vec<Notice>,
}

impl TemplateEditor {
    /// Open an editing session, empty or from an existing template.
    pub fn open(template: Option<&Template>, config: EditorConfig) -> Result<Self, TemplateError> {
        let (store, meta) = match template {
            Some(t) => (template::deserialize(t, &config)?, TemplateMeta::from_template(t)),
            None => (SceneStore::new(&config), TemplateMeta::named("Untitled")),
        };
        log::info!(
            "editor opened: {} ({} elements, session {})",
            meta.name,
            store.elements().len(),
            store.session()
        );
        Ok(Self {
            controller: InteractionController::new(&config),
            config,
            store,
            layer: PaintLayer::new(),
            properties: PropertyEditor::new(),
            meta,
            images: Box::new(DataUrlSource),
            preview: ImageCache::new(),
            fonts: FontBook::new(),
            on_save: None,
            on_close: None,
            notices: Vec::new(),
        })
    }

    pub fn on_save(mut self, callback: impl FnMut(&Template) + 'static) -> Self {
        self.on_save = Some(Box::new(callback));
        self
    }

    pub fn on_close(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    /// Replace the resolver used for image elements during export.
    pub fn with_image_source(mut self, source: impl ImageSource + 'static) -> Self {
        self.images = Box::new(source);
        self.preview.clear();
        self
    }

    /// Make a font face available to text elements naming `family`.
    pub fn register_font(&mut self, family: &str, weight: FontWeight, data: Vec<u8>) -> Result<(), FontError> {
        self.fonts.register(family, weight, data)?;
        log::info!("registered font {family} ({weight:?})");
        Ok(())
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SceneStore {
        &mut self.store
    }

    pub fn layer(&self) -> &PaintLayer {
        &self.layer
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    pub fn meta(&self) -> &TemplateMeta {
        &self.meta
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.meta.name = name.into();
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.meta.category = category.into();
    }

    pub fn display_list(&self) -> DisplayList {
        DisplayList::build(self.store.scene())
    }

    pub fn overlay(&self) -> Overlay {
        self.controller.overlay(&self.store)
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Paint the current view at the controller's zoom into a freshly
    /// reset Vello scene.
    pub fn paint(&mut self, scene: &mut Scene) {
        let list = self.display_list();
        let overlay = self.overlay();
        let view = Affine::scale(f64::from(self.controller.zoom()));
        tpl_render::paint_scene(
            scene,
            &list,
            &self.layer,
            &overlay,
            view,
            &mut self.preview,
            self.images.as_ref(),
            &self.fonts,
        );
    }

    // ─── Interaction ─────────────────────────────────────────────────────

    pub fn mount(&mut self) {
        self.controller.mount();
    }

    pub fn unmount(&mut self) {
        self.controller.unmount();
    }

    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        self.controller.handle_event(&mut self.store, &mut self.layer, event)
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.controller.set_tool(&mut self.store, &mut self.layer, tool);
    }

    pub fn undo(&mut self) -> bool {
        self.controller.undo(&mut self.store, &mut self.layer)
    }

    pub fn redo(&mut self) -> bool {
        self.controller.redo(&mut self.store, &mut self.layer)
    }

    /// Remove the most recent brush or pencil stroke.
    pub fn undo_stroke(&mut self) -> bool {
        self.layer.undo_stroke()
    }

    pub fn properties(&self) -> serde_json::Value {
        self.properties.panel(&self.store)
    }

    pub fn set_property(&mut self, field: PropertyField, value: &PropertyValue) -> Result<bool, PropertyError> {
        self.properties.set(&mut self.store, field, value)
    }

    pub fn property_editor(&self) -> PropertyEditor {
        self.properties
    }

    // ─── Save / export / import ──────────────────────────────────────────

    /// Serialize the scene, hand it to the save callback and return it.
    /// The template keeps its id and creation time across re-saves.
    pub fn save(&mut self) -> Template {
        let mut meta = self.meta.clone();
        meta.thumbnail = match tpl_render::thumbnail_data_url(
            self.store.scene(),
            &self.layer,
            THUMBNAIL_SIZE,
            self.images.as_ref(),
            &self.fonts,
        ) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("saving without thumbnail: {e}");
                None
            }
        };
        let template = template::serialize(&self.store, meta);
        self.meta = TemplateMeta::from_template(&template);
        if let Some(callback) = self.on_save.as_mut() {
            callback(&template);
        }
        log::info!("saved template {} ({})", template.name, template.id);
        self.notices.push(Notice::Saved(format!("Saved \"{}\"", template.name)));
        template
    }

    /// End the session. Unsaved changes are discarded.
    pub fn close(mut self) {
        self.controller.unmount();
        if let Some(callback) = self.on_close.take() {
            callback();
        }
        log::info!("editor closed (session {})", self.store.session());
    }

    /// Export the scene. On failure a notice is queued and `None` returned;
    /// the scene is never modified either way.
    pub fn export(&mut self, format: ExportFormat, quality: f32) -> Option<Vec<u8>> {
        let request = ExportRequest::new(format, quality).with_jpeg_quality(self.config.export.jpeg_quality);
        match tpl_render::rasterize(self.store.scene(), &self.layer, &request, self.images.as_ref(), &self.fonts) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                self.notices.push(Notice::ExportFailed(e.user_message()));
                None
            }
        }
    }

    /// Replace the scene with a template given as JSON. Invalid input
    /// queues a notice and leaves the current scene untouched.
    pub fn import_json(&mut self, json: &str) -> bool {
        let loaded = Template::from_json(json).and_then(|t| Ok((template::deserialize(&t, &self.config)?, t)));
        match loaded {
            Ok((store, template)) => {
                self.controller.set_tool(&mut self.store, &mut self.layer, ToolKind::default());
                self.store = store;
                self.layer.clear();
                self.meta = TemplateMeta::from_template(&template);
                log::info!("imported template {} ({} elements)", template.name, template.elements.len());
                true
            }
            Err(e) => {
                log::warn!("import rejected: {e}");
                self.notices.push(Notice::InvalidTemplate(e.to_string()));
                false
            }
        }
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
