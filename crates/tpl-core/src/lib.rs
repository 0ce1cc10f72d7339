//! Core document model for the template editor: elements, the scene store
//! with snapshot undo history, the freehand paint layer, and the persisted
//! template format.

pub mod config;
pub mod history;
pub mod id;
pub mod model;
pub mod paint_layer;
pub mod scene;
pub mod template;
pub mod tool;

pub use config::{ConfigError, EditorConfig};
pub use history::History;
pub use id::{ElementId, IdAllocator};
pub use model::*;
pub use paint_layer::{BrushTip, PaintLayer, PaintStroke};
pub use scene::{Scene, SceneStore, Selection, ZOrder};
pub use template::{Template, TemplateCollection, TemplateError, TemplateMeta, STORAGE_KEY};
pub use tool::ToolKind;
