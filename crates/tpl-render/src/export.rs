//! Export pipeline: scene → raster image or single-page PDF.
//!
//! Export always captures the logical canvas (`canvas_size`), never the
//! zoomed on-screen view. Image formats are scaled by the quality
//! multiplier; the PDF embeds one full-bleed JPEG at scale 1 on a page the
//! size of the canvas.

use crate::display::DisplayList;
use crate::raster::Rasterizer;
use crate::source::{ImageSource, short_src};
use crate::text::FontBook;
use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageFormat, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::io::Cursor;
use tpl_core::{PaintLayer, Scene};

pub const DEFAULT_JPEG_QUALITY: u8 = 92;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid export quality {0}; expected a finite value above zero")]
    InvalidQuality(f32),
    #[error("export would produce an empty {width}x{height} image")]
    EmptyOutput { width: u32, height: u32 },
    #[error("export of {width}x{height} pixels exceeds the size limit")]
    TooLarge { width: u64, height: u64 },
    #[error("image resource `{0}` cannot be read (blocked or external)")]
    BlockedResource(String),
    #[error("image `{src}` could not be decoded: {reason}")]
    Decode { src: String, reason: String },
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("pdf generation failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    /// Paginated document: one page holding the whole canvas.
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::Pdf];

    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Whether the quality multiplier applies.
    pub fn is_image(self) -> bool {
        !matches!(self, ExportFormat::Pdf)
    }
}

/// What to export and how.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    /// Output scale for image formats; ignored for PDF.
    pub quality: f32,
    /// JPEG encoder quality, used for JPEG output and the PDF page image.
    pub jpeg_quality: u8,
}

impl ExportRequest {
    pub fn new(format: ExportFormat, quality: f32) -> Self {
        Self {
            format,
            quality,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, jpeg_quality: u8) -> Self {
        self.jpeg_quality = jpeg_quality.clamp(1, 100);
        self
    }
}

/// Compose the scene and paint layer into an RGBA buffer at `scale`.
pub fn render_image(
    scene: &Scene,
    layer: &PaintLayer,
    scale: f32,
    source: &dyn ImageSource,
    fonts: &FontBook,
) -> Result<RgbaImage, ExportError> {
    let mut raster = Rasterizer::new(scene.canvas_size(), f64::from(scale))?;
    raster.paint_display_list(&DisplayList::build(scene), source, fonts)?;
    raster.paint_layer(layer);
    Ok(raster.finish())
}

/// Small PNG preview as a `data:` URL, scaled down so the longer canvas
/// side is at most `max_side` pixels.
pub fn thumbnail_data_url(
    scene: &Scene,
    layer: &PaintLayer,
    max_side: u32,
    source: &dyn ImageSource,
    fonts: &FontBook,
) -> Result<String, ExportError> {
    let size = scene.canvas_size();
    let scale = (max_side as f32 / size.width.max(size.height)).min(1.0);
    let png = encode_png(&render_image(scene, layer, scale, source, fonts)?)?;
    Ok(format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png)))
}

/// Rasterize and encode. Nothing here touches the scene, so a failure
/// leaves the editor exactly as it was.
pub fn rasterize(
    scene: &Scene,
    layer: &PaintLayer,
    request: &ExportRequest,
    source: &dyn ImageSource,
    fonts: &FontBook,
) -> Result<Vec<u8>, ExportError> {
    let result = match request.format {
        ExportFormat::Png => {
            render_image(scene, layer, checked_quality(request.quality)?, source, fonts).and_then(|img| encode_png(&img))
        }
        ExportFormat::Jpeg => render_image(scene, layer, checked_quality(request.quality)?, source, fonts)
            .and_then(|img| encode_jpeg(&img, request.jpeg_quality)),
        ExportFormat::Pdf => render_image(scene, layer, 1.0, source, fonts).and_then(|img| {
            let jpeg = encode_jpeg(&img, request.jpeg_quality)?;
            let size = scene.canvas_size();
            encode_pdf(&jpeg, img.dimensions(), (size.width, size.height))
        }),
    };
    match &result {
        Ok(bytes) => log::debug!("exported {} ({} bytes)", request.format.name(), bytes.len()),
        Err(e) => log::warn!("export {} failed: {e}", request.format.name()),
    }
    result
}

fn checked_quality(quality: f32) -> Result<f32, ExportError> {
    if quality.is_finite() && quality > 0.0 {
        Ok(quality)
    } else {
        Err(ExportError::InvalidQuality(quality))
    }
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// JPEG has no alpha channel; the image is flattened to RGB first.
pub fn encode_jpeg(img: &RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
    Ok(bytes)
}

/// Single-page PDF whose page is `page_size` points with the JPEG drawn
/// full-bleed.
pub fn encode_pdf(jpeg: &[u8], pixels: (u32, u32), page_size: (f32, f32)) -> Result<Vec<u8>, ExportError> {
    let (pw, ph) = page_size;
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(pixels.0),
            "Height" => i64::from(pixels.1),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg.to_vec(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![pw.into(), 0.into(), 0.into(), ph.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), pw.into(), ph.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

impl ExportError {
    /// Short user-facing message for an export-failed notice.
    pub fn user_message(&self) -> String {
        match self {
            ExportError::BlockedResource(src) => {
                format!("An image could not be included ({}). Re-upload it and try again.", short_src(src))
            }
            ExportError::InvalidQuality(_) | ExportError::EmptyOutput { .. } => {
                "The chosen export quality is not valid.".to_string()
            }
            ExportError::TooLarge { .. } => {
                "The export is too large. Choose a lower quality and try again.".to_string()
            }
            _ => "Export failed. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DataUrlSource;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_names() {
        for f in ExportFormat::ALL {
            assert_eq!(ExportFormat::from_name(f.name()), Some(f));
        }
        assert_eq!(ExportFormat::from_name("JPG"), Some(ExportFormat::Jpeg));
        assert!(!ExportFormat::Pdf.is_image());
    }

    #[test]
    fn thumbnail_fits_max_side() {
        let scene = Scene::new(tpl_core::Size::new(800.0, 400.0));
        let url = thumbnail_data_url(&scene, &PaintLayer::new(), 200, &DataUrlSource, &FontBook::new()).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        let img = DataUrlSource.load(&url).unwrap();
        assert_eq!(img.dimensions(), (200, 100));
    }

    #[test]
    fn non_positive_quality_is_rejected() {
        let scene = Scene::new(tpl_core::Size::new(10.0, 10.0));
        let layer = PaintLayer::new();
        for q in [0.0, -1.0, f32::INFINITY] {
            let req = ExportRequest::new(ExportFormat::Png, q);
            assert!(matches!(
                rasterize(&scene, &layer, &req, &DataUrlSource, &FontBook::new()),
                Err(ExportError::InvalidQuality(_))
            ));
        }
    }

    #[test]
    fn pdf_ignores_quality() {
        let scene = Scene::new(tpl_core::Size::new(20.0, 10.0));
        let req = ExportRequest::new(ExportFormat::Pdf, -3.0);
        let bytes = rasterize(&scene, &PaintLayer::new(), &req, &DataUrlSource, &FontBook::new()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
    }

    #[test]
    fn oversized_quality_fails_cleanly() {
        let scene = Scene::new(tpl_core::Size::new(800.0, 600.0));
        let req = ExportRequest::new(ExportFormat::Png, 1e7);
        let err = rasterize(&scene, &PaintLayer::new(), &req, &DataUrlSource, &FontBook::new()).unwrap_err();
        assert!(matches!(err, ExportError::TooLarge { .. }));
        assert!(err.user_message().contains("lower quality"));
    }

    #[test]
    fn blocked_resource_message_is_short() {
        let err = ExportError::BlockedResource("https://example.com/".repeat(10));
        assert!(err.user_message().len() < 150);
    }
}
