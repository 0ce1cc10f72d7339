//! Input abstraction layer.
//!
//! Normalizes pointer and keyboard events from the host into `InputEvent`
//! values. Pointer positions arrive in screen space (relative to the canvas
//! element, zoom applied); the controller converts them to canvas space.

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// ⌘ on macOS.
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl or ⌘, whichever the platform uses for commands.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A keyboard event as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`, `"["`).
    pub key: String,
    pub modifiers: Modifiers,
    /// Whether a text field had input focus when the key was pressed.
    pub text_input_focused: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            text_input_focused: false,
        }
    }

    pub fn plain(key: impl Into<String>) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn in_text_field(mut self) -> Self {
        self.text_input_focused = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed.
    PointerDown { x: f32, y: f32, modifiers: Modifiers },
    /// Pointer moved, pressed or not.
    PointerMove { x: f32, y: f32, modifiers: Modifiers },
    /// Pointer released.
    PointerUp { x: f32, y: f32, modifiers: Modifiers },
    Key(KeyEvent),
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::PointerDown { x, y, .. } | Self::PointerMove { x, y, .. } | Self::PointerUp { x, y, .. } => {
                Some((*x, *y))
            }
            Self::Key(_) => None,
        }
    }

    /// The same event with its position divided by `zoom`.
    pub fn unzoomed(&self, zoom: f32) -> Self {
        let z = if zoom > 0.0 && zoom.is_finite() { zoom } else { 1.0 };
        match self {
            Self::PointerDown { x, y, modifiers } => Self::PointerDown {
                x: x / z,
                y: y / z,
                modifiers: *modifiers,
            },
            Self::PointerMove { x, y, modifiers } => Self::PointerMove {
                x: x / z,
                y: y / z,
                modifiers: *modifiers,
            },
            Self::PointerUp { x, y, modifiers } => Self::PointerUp {
                x: x / z,
                y: y / z,
                modifiers: *modifiers,
            },
            Self::Key(k) => Self::Key(k.clone()),
        }
    }
}
