//! Rendering and export for template scenes.
//!
//! [`display::DisplayList`] is the shared intermediate form: the Vello
//! painter draws it on screen and the CPU [`raster::Rasterizer`] turns it
//! into export bytes. Both lay text out through [`text::FontBook`].

pub mod display;
pub mod export;
pub mod hit;
pub mod paint;
pub mod raster;
pub mod source;
pub mod text;

pub use display::{DisplayItem, DisplayList, Overlay, Primitive};
pub use export::{ExportError, ExportFormat, ExportRequest, rasterize, render_image, thumbnail_data_url};
pub use hit::{contained_in_rect, hit_test};
pub use paint::{ImageCache, paint_scene};
pub use raster::Rasterizer;
pub use source::{DataUrlSource, ImageSource, MemorySource};
pub use text::{FontBook, FontError, TextLayout, layout_text};
pub use vello;
