//! Keyboard shortcut mapping.
//!
//! Single keys switch the active tool through a declaration-ordered table;
//! when two tools share a key the later declaration wins. Command combos
//! (Ctrl or ⌘) drive history and duplication, and a few bare keys edit the
//! selection.

use crate::input::{KeyEvent, Modifiers};
use std::collections::HashMap;
use tpl_core::ToolKind;

/// Tool bindings in declaration order. `b`, `o` and `u` are each bound
/// twice; the second binding is the one that takes effect.
pub const TOOL_BINDINGS: &[(&str, ToolKind)] = &[
    ("v", ToolKind::Move),
    ("m", ToolKind::Marquee),
    ("l", ToolKind::Lasso),
    ("w", ToolKind::QuickSelect),
    ("b", ToolKind::Brush),
    ("b", ToolKind::Pencil),
    ("e", ToolKind::Eraser),
    ("s", ToolKind::Clone),
    ("j", ToolKind::Healing),
    ("o", ToolKind::Dodge),
    ("o", ToolKind::Burn),
    ("r", ToolKind::Smudge),
    ("t", ToolKind::Text),
    ("c", ToolKind::Crop),
    ("u", ToolKind::Upload),
    ("u", ToolKind::Shape),
    ("i", ToolKind::Eyedropper),
];

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    SetTool(ToolKind),
    Undo,
    Redo,
    Delete,
    Duplicate,
    SendBackward,
    BringForward,
    Deselect,
}

/// Two tools declared on the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: String,
    /// The earlier binding, now unreachable from the keyboard.
    pub shadowed: ToolKind,
    pub winner: ToolKind,
}

#[derive(Debug, Clone)]
pub struct ShortcutMap {
    tools: HashMap<String, ToolKind>,
    collisions: Vec<KeyCollision>,
}

impl Default for ShortcutMap {
    fn default() -> Self {
        Self::from_bindings(TOOL_BINDINGS)
    }
}

impl ShortcutMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a declaration-ordered table. Collisions are recorded and
    /// logged, never rejected.
    pub fn from_bindings(bindings: &[(&str, ToolKind)]) -> Self {
        let mut tools = HashMap::with_capacity(bindings.len());
        let mut collisions = Vec::new();
        for &(key, tool) in bindings {
            let key = key.to_lowercase();
            if let Some(previous) = tools.insert(key.clone(), tool)
                && previous != tool
            {
                log::warn!(
                    "shortcut `{key}` bound to both {} and {}; {} wins",
                    previous.name(),
                    tool.name(),
                    tool.name()
                );
                collisions.push(KeyCollision {
                    key,
                    shadowed: previous,
                    winner: tool,
                });
            }
        }
        Self { tools, collisions }
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }

    pub fn tool_for_key(&self, key: &str) -> Option<ToolKind> {
        self.tools.get(&key.to_lowercase()).copied()
    }

    /// Resolve a key event to an action. Keys typed into a text field never
    /// resolve.
    pub fn resolve_event(&self, event: &KeyEvent) -> Option<ShortcutAction> {
        if event.text_input_focused {
            return None;
        }
        self.resolve(&event.key, event.modifiers)
    }

    /// Resolve a key + modifiers combo. Returns `None` if unbound.
    pub fn resolve(&self, key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.command();

        // ── Modifier combos first (most specific) ──
        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "d" | "D" => Some(ShortcutAction::Duplicate),
                _ => None,
            };
        }

        if modifiers.alt {
            return None;
        }

        // ── Single keys ──
        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            "[" => Some(ShortcutAction::SendBackward),
            "]" => Some(ShortcutAction::BringForward),
            _ if key.chars().count() == 1 => self.tool_for_key(key).map(ShortcutAction::SetTool),
            _ => None,
        }
    }
}
