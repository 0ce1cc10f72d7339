//! Interactive editing for templates: input events, tools, keyboard
//! shortcuts, the property editor and the editor session.

pub mod controller;
pub mod editor;
pub mod input;
pub mod properties;
pub mod shortcuts;
pub mod tools;

pub use controller::{BrushSettings, InteractionController, KeyboardSubscription};
pub use editor::{Notice, TemplateEditor};
pub use input::{InputEvent, KeyEvent, Modifiers};
pub use properties::{PropertyEditor, PropertyError, PropertyField, PropertyValue};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::{EditOp, Tool};
