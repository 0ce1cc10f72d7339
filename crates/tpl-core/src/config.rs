//! Editor configuration.
//!
//! Every field has a default, so a host may pass a partial JSON object
//! (or nothing at all) and only override what it cares about.

use crate::model::{Color, Size};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Canvas size for a new, empty template.
    pub canvas_size: Size,
    /// Offset applied to a duplicated element so the copy is visible.
    pub duplicate_offset: (f32, f32),
    pub history: HistoryConfig,
    pub brush: BrushConfig,
    pub zoom: ZoomConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Retained snapshots; `None` keeps everything.
    pub capacity: Option<usize>,
    /// Fold a whole pointer gesture (drag, marquee) into one undo step.
    /// When off, every intermediate pointer move is its own step.
    pub batch_gestures: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub size: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f32,
    pub max: f32,
    pub initial: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    /// JPEG encoder quality, 1..=100.
    pub jpeg_quality: u8,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_size: Size::new(800.0, 600.0),
            duplicate_offset: (20.0, 20.0),
            history: HistoryConfig::default(),
            brush: BrushConfig::default(),
            zoom: ZoomConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            batch_gestures: true,
        }
    }
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            size: 5.0,
            color: Color::BLACK,
        }
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 8.0,
            initial: 1.0,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { jpeg_quality: 92 }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON config object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        let Size { width, height } = self.canvas_size;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return invalid("canvasSize", "width and height must be positive");
        }
        if self.history.capacity == Some(0) {
            return invalid("history.capacity", "must keep at least one snapshot");
        }
        if !(self.brush.size.is_finite() && self.brush.size > 0.0) {
            return invalid("brush.size", "must be positive");
        }
        let z = self.zoom;
        if !(z.min > 0.0 && z.min <= z.initial && z.initial <= z.max && z.max.is_finite()) {
            return invalid("zoom", "expected 0 < min <= initial <= max");
        }
        if !(1..=100).contains(&self.export.jpeg_quality) {
            return invalid("export.jpegQuality", "must be within 1..=100");
        }
        Ok(())
    }

    /// Clamp a zoom factor into the configured range.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_finite() {
            zoom.clamp(self.zoom.min, self.zoom.max)
        } else {
            self.zoom.initial
        }
    }
}
