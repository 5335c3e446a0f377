//! # portfolio-export – portfolio case studies → PDF / DOCX
//!
//! Records flow one way through the crate:
//!
//! 1. **Load** – every named record comes from a [`store::RecordStore`]
//! 2. **Assemble** – records → one HTML document ([`assemble`])
//! 3. **Render** – one of:
//!    - HTML → PDF through an [`pipeline::HtmlToPdf`] converter
//!    - HTML → editable DOCX, fetching images on the way ([`editable`])
//!    - records → fixed assignment-details DOCX template ([`template`])
//! 4. **Persist** – bytes → [`store::FileStore`], returning a file URL ([`export`])

pub mod assemble;
pub mod blocks;
pub mod config;
pub mod docx;
pub mod dom;
pub mod editable;
pub mod error;
pub mod export;
pub mod fetch;
pub mod fonts;
pub mod layout;
pub mod layout_config;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod store;
pub mod template;

// Re-exports for convenience
pub use config::{EscapeMode, ExportConfig, ImageFailurePolicy};
pub use error::ExportError;
pub use export::{ExportFormat, ExportResponse, ExportResult, ExportStatus, Exporter};
pub use model::PortfolioRecord;
