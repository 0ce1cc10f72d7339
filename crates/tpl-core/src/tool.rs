use serde::{Deserialize, Serialize};

/// Every tool identifier the editor toolbar knows about.
///
/// Only some tools act on the canvas (see [`ToolKind::is_canvas_tool`]);
/// the rest are selectable but leave the scene untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    #[default]
    Move,
    Marquee,
    Lasso,
    QuickSelect,
    Brush,
    Pencil,
    Eraser,
    Clone,
    Healing,
    Dodge,
    Burn,
    Smudge,
    Text,
    Crop,
    Upload,
    Shape,
    Eyedropper,
}

impl ToolKind {
    pub const ALL: [ToolKind; 17] = [
        ToolKind::Move,
        ToolKind::Marquee,
        ToolKind::Lasso,
        ToolKind::QuickSelect,
        ToolKind::Brush,
        ToolKind::Pencil,
        ToolKind::Eraser,
        ToolKind::Clone,
        ToolKind::Healing,
        ToolKind::Dodge,
        ToolKind::Burn,
        ToolKind::Smudge,
        ToolKind::Text,
        ToolKind::Crop,
        ToolKind::Upload,
        ToolKind::Shape,
        ToolKind::Eyedropper,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Move => "move",
            ToolKind::Marquee => "marquee",
            ToolKind::Lasso => "lasso",
            ToolKind::QuickSelect => "quick-select",
            ToolKind::Brush => "brush",
            ToolKind::Pencil => "pencil",
            ToolKind::Eraser => "eraser",
            ToolKind::Clone => "clone",
            ToolKind::Healing => "healing",
            ToolKind::Dodge => "dodge",
            ToolKind::Burn => "burn",
            ToolKind::Smudge => "smudge",
            ToolKind::Text => "text",
            ToolKind::Crop => "crop",
            ToolKind::Upload => "upload",
            ToolKind::Shape => "shape",
            ToolKind::Eyedropper => "eyedropper",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Tools with defined pointer behavior. The others are recognized
    /// identifiers that perform no canvas mutation.
    pub fn is_canvas_tool(self) -> bool {
        matches!(
            self,
            ToolKind::Move
                | ToolKind::Marquee
                | ToolKind::Brush
                | ToolKind::Pencil
                | ToolKind::Text
                | ToolKind::Shape
                | ToolKind::Eyedropper
        )
    }
}
