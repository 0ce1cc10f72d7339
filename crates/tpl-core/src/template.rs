//! Persisted template format.
//!
//! A [`Template`] is the structural content of a scene plus catalogue
//! metadata. Transient editor state (selection, active tool, paint-layer
//! strokes) is never written. Templates live in an external collection
//! stored as one JSON list under [`STORAGE_KEY`]; this module only knows the
//! format, not the storage.

use crate::config::EditorConfig;
use crate::id::ElementId;
use crate::model::{Element, Size};
use crate::scene::{Scene, SceneStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key under which the host stores the template collection.
pub const STORAGE_KEY: &str = "print_templates";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("template is invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub elements: Vec<Element>,
    pub canvas_size: Size,
    /// Preview image, usually a `data:` URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Catalogue metadata supplied when saving a scene.
#[derive(Debug, Clone, Default)]
pub struct TemplateMeta {
    /// Keep an existing id when re-saving; a fresh one is minted otherwise.
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    pub thumbnail: Option<String>,
    /// Keep the original creation time when re-saving.
    pub created_at: Option<DateTime<Utc>>,
}

impl TemplateMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Metadata that re-saves over an existing template.
    pub fn from_template(template: &Template) -> Self {
        Self {
            id: Some(template.id.clone()),
            name: template.name.clone(),
            category: template.category.clone(),
            thumbnail: template.thumbnail.clone(),
            created_at: Some(template.created_at),
        }
    }
}

/// Capture the structural state of a store as a template.
pub fn serialize(store: &SceneStore, meta: TemplateMeta) -> Template {
    let scene = store.scene();
    Template {
        id: meta.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: meta.name,
        category: meta.category,
        elements: scene.elements().to_vec(),
        canvas_size: scene.canvas_size(),
        thumbnail: meta.thumbnail,
        created_at: meta.created_at.unwrap_or_else(Utc::now),
    }
}

/// Build a fresh store (new session, empty history) from a template.
/// Element ids and z-indices are preserved verbatim.
pub fn deserialize(template: &Template, config: &EditorConfig) -> Result<SceneStore, TemplateError> {
    template.validate()?;
    let mut elements = template.elements.clone();
    for element in &mut elements {
        element.normalize();
    }
    let scene = Scene::from_elements(elements, template.canvas_size);
    SceneStore::from_scene(scene, config)
        .ok_or_else(|| TemplateError::Invalid("no element ids left to allocate".into()))
}

impl Template {
    /// Parse and validate a template from JSON.
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let template: Template = serde_json::from_str(json)?;
        template.validate()?;
        Ok(template)
    }

    pub fn to_json(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject content that cannot form a scene.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let Size { width, height } = self.canvas_size;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(TemplateError::Invalid(format!(
                "canvas size must be positive, got {width} x {height}"
            )));
        }
        let mut seen: HashSet<ElementId> = HashSet::with_capacity(self.elements.len());
        for element in &self.elements {
            if element.id > ElementId::MAX {
                return Err(TemplateError::Invalid(format!(
                    "element id {} exceeds {}",
                    element.id.raw(),
                    ElementId::MAX.raw()
                )));
            }
            if !seen.insert(element.id) {
                return Err(TemplateError::Invalid(format!("duplicate element id {}", element.id)));
            }
            if !element.is_finite() {
                return Err(TemplateError::Invalid(format!(
                    "element {} has a non-finite attribute",
                    element.id
                )));
            }
            if element.width < 0.0 || element.height < 0.0 {
                return Err(TemplateError::Invalid(format!(
                    "element {} has a negative size",
                    element.id
                )));
            }
        }
        Ok(())
    }
}

// ─── Collection ──────────────────────────────────────────────────────────

/// The external template collection, keyed by template id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateCollection {
    templates: Vec<Template>,
}

impl TemplateCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored list. Every template in it must validate.
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let collection: Self = serde_json::from_str(json)?;
        for template in &collection.templates {
            template.validate()?;
        }
        Ok(collection)
    }

    pub fn to_json(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Insert, or replace the template with the same id.
    pub fn upsert(&mut self, template: Template) {
        match self.templates.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Template> {
        let idx = self.templates.iter().position(|t| t.id == id)?;
        Some(self.templates.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
