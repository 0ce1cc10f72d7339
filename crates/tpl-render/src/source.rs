//! Image resolution for painting and export.

use crate::export::ExportError;
use base64::{Engine as _, engine::general_purpose};
use image::RgbaImage;
use std::collections::HashMap;

/// Resolves an image element's `src` to pixels.
pub trait ImageSource {
    fn load(&self, src: &str) -> Result<RgbaImage, ExportError>;
}

/// Decodes inline `data:` URLs. Any other scheme is treated as a blocked
/// external resource, the same way a tainted cross-origin image would be.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlSource;

impl ImageSource for DataUrlSource {
    fn load(&self, src: &str) -> Result<RgbaImage, ExportError> {
        let Some(rest) = src.strip_prefix("data:") else {
            return Err(ExportError::BlockedResource(short_src(src)));
        };
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| decode_error(src, "missing `,` separator"))?;
        if !header.ends_with(";base64") {
            return Err(decode_error(src, "only base64 data URLs are supported"));
        }
        let bytes = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| decode_error(src, &e.to_string()))?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| decode_error(src, &e.to_string()))?;
        Ok(decoded.to_rgba8())
    }
}

/// Images decoded ahead of time by the host, keyed by `src`. Misses fall
/// back to [`DataUrlSource`].
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    images: HashMap<String, RgbaImage>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, src: impl Into<String>, image: RgbaImage) {
        self.images.insert(src.into(), image);
    }

    pub fn remove(&mut self, src: &str) -> Option<RgbaImage> {
        self.images.remove(src)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageSource for MemorySource {
    fn load(&self, src: &str) -> Result<RgbaImage, ExportError> {
        match self.images.get(src) {
            Some(image) => Ok(image.clone()),
            None => DataUrlSource.load(src),
        }
    }
}

fn decode_error(src: &str, reason: &str) -> ExportError {
    ExportError::Decode {
        src: short_src(src),
        reason: reason.to_string(),
    }
}

/// Data URLs can be megabytes long; keep error messages readable.
pub(crate) fn short_src(src: &str) -> String {
    const MAX: usize = 48;
    match src.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &src[..idx]),
        None => src.to_string(),
    }
}
