//! Print documents for a vehicle dealership: quotes, invoices and purchase
//! orders rendered to markup, captured as bitmaps and assembled into A4 PDFs.

pub mod capture;
pub mod config;
pub mod error;
pub mod font_metrics;
pub mod format;
pub mod host;
pub mod images;
pub mod kind;
pub mod layout;
pub mod layout_box;
pub mod paginate;
pub mod pdf;
pub mod preview;
pub mod raster;
pub mod record;
pub mod server;
pub mod template;
pub mod terms;

pub use error::ExportError;
pub use kind::DocumentKind;
pub use preview::PreviewSurface;
pub use record::DocumentRecord;
