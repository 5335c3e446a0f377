//! Export orchestrator – validates input, dispatches to a renderer by format,
//! persists the resulting bytes and reports a retrievable file reference.
//!
//! Every collaborator is passed in explicitly. All records are loaded before
//! any rendering, and nothing is persisted unless the whole document rendered.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::assemble::{assemble_records, load_records};
use crate::config::ExportConfig;
use crate::editable::render_editable;
use crate::error::{ExportError, Result};
use crate::fetch::ImageFetcher;
use crate::pipeline::HtmlToPdf;
use crate::store::{FileReference, FileStore, RecordStore};
use crate::template::FixedTemplateDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// HTML rendered to PDF.
    Pdf,
    /// HTML rendered to an editable DOCX document.
    Docx,
    /// Fixed assignment-details table template (DOCX).
    WorldBank,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx | ExportFormat::WorldBank => "docx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => write!(f, "pdf"),
            ExportFormat::Docx => write!(f, "docx"),
            ExportFormat::WorldBank => write!(f, "world_bank"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            "world_bank" | "world-bank" => Ok(ExportFormat::WorldBank),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Success,
    Error,
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
    pub status: ExportStatus,
    pub message: String,
    pub file: FileReference,
}

/// Payload returned by [`Exporter::export_portfolio`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
    pub status: ExportStatus,
    pub message: String,
    pub file_url: Option<String>,
}

impl From<Result<ExportResult>> for ExportResponse {
    fn from(result: Result<ExportResult>) -> Self {
        match result {
            Ok(r) => Self {
                status: r.status,
                message: r.message,
                file_url: Some(r.file.file_url),
            },
            Err(e) => Self {
                status: ExportStatus::Error,
                message: e.to_string(),
                file_url: None,
            },
        }
    }
}

/// `portfolio_export_<YYYYmmddHHMMSS>.<ext>`
pub fn export_file_name(format: ExportFormat, at: DateTime<Local>) -> String {
    format!(
        "portfolio_export_{}.{}",
        at.format("%Y%m%d%H%M%S"),
        format.extension()
    )
}

/// Parse the JSON-encoded list of record names.
pub fn parse_names(json: &str) -> Result<Vec<String>> {
    let names: Option<Vec<String>> = serde_json::from_str(json)
        .map_err(|e| ExportError::InvalidInput(format!("portfolio names must be a JSON list of strings: {e}")))?;
    let names = names.unwrap_or_default();
    if names.is_empty() {
        return Err(ExportError::InvalidInput(
            "no portfolio names provided".to_string(),
        ));
    }
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(ExportError::InvalidInput(
            "portfolio names must not be blank".to_string(),
        ));
    }
    Ok(names)
}

pub struct Exporter<'a> {
    records: &'a dyn RecordStore,
    files: &'a dyn FileStore,
    fetcher: &'a dyn ImageFetcher,
    pdf: &'a dyn HtmlToPdf,
    config: ExportConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(
        records: &'a dyn RecordStore,
        files: &'a dyn FileStore,
        fetcher: &'a dyn ImageFetcher,
        pdf: &'a dyn HtmlToPdf,
    ) -> Self {
        Self {
            records,
            files,
            fetcher,
            pdf,
            config: ExportConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Render the named records in `format` without persisting anything.
    pub fn render(&self, names: &[String], format: ExportFormat) -> Result<Vec<u8>> {
        let records = load_records(self.records, names)?;
        match format {
            ExportFormat::Pdf => {
                let html = assemble_records(&records, &self.config);
                self.pdf.convert(html.as_str())
            }
            ExportFormat::Docx => {
                let html = assemble_records(&records, &self.config);
                render_editable(html.as_str(), self.fetcher, &self.config)
            }
            ExportFormat::WorldBank => FixedTemplateDocument::from_records(&records).to_docx(),
        }
    }

    /// Export the named records and persist the result.
    pub fn export(&self, names: &[String], format: ExportFormat) -> Result<ExportResult> {
        self.export_at(names, format, Local::now())
    }

    /// Like [`Exporter::export`] with an explicit timestamp for the file name.
    pub fn export_at(
        &self,
        names: &[String],
        format: ExportFormat,
        at: DateTime<Local>,
    ) -> Result<ExportResult> {
        if names.is_empty() {
            return Err(ExportError::InvalidInput(
                "no portfolio names provided".to_string(),
            ));
        }
        log::info!("Exporting {} portfolio(s) as {format}", names.len());

        let bytes = self.render(names, format)?;
        let file_name = export_file_name(format, at);
        let file = self
            .files
            .persist(&file_name, &bytes, self.config.private_files)?;
        log::info!("Export stored at {}", file.file_url);

        Ok(ExportResult {
            status: ExportStatus::Success,
            message: "Portfolios exported successfully.".to_string(),
            file,
        })
    }

    /// Public surface: JSON-encoded names and a format token in, a status
    /// payload out. Errors are reported in the payload, never raised.
    pub fn export_portfolio(&self, portfolio_names: &str, format: &str) -> ExportResponse {
        let result = parse_names(portfolio_names).and_then(|names| {
            let format: ExportFormat = format.parse()?;
            self.export(&names, format)
        });
        if let Err(e) = &result {
            log::warn!("Export failed: {e}");
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_tokens_parse_case_insensitively() {
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!(" DOCX ".parse::<ExportFormat>().unwrap(), ExportFormat::Docx);
        assert_eq!(
            "world_bank".parse::<ExportFormat>().unwrap(),
            ExportFormat::WorldBank
        );
        assert!(matches!(
            "xyz".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(t)) if t == "xyz"
        ));
        assert!("html".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn extensions_match_formats() {
        assert_eq!(ExportFormat::Pdf.extension(), "pdf");
        assert_eq!(ExportFormat::Docx.extension(), "docx");
        assert_eq!(ExportFormat::WorldBank.extension(), "docx");
    }

    #[test]
    fn file_name_carries_timestamp_and_extension() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            export_file_name(ExportFormat::Pdf, at),
            "portfolio_export_20240309140507.pdf"
        );
    }

    #[test]
    fn names_must_be_a_non_empty_json_list() {
        assert_eq!(parse_names(r#"["PF-1","PF-2"]"#).unwrap(), vec!["PF-1", "PF-2"]);
        for bad in ["", "null", "[]", "PF-1", r#"{"a":1}"#, r#"["PF-1", " "]"#] {
            assert!(
                matches!(parse_names(bad), Err(ExportError::InvalidInput(_))),
                "expected InvalidInput for {bad:?}"
            );
        }
    }

    #[test]
    fn error_result_becomes_error_payload() {
        let response: ExportResponse = Err(ExportError::UnsupportedFormat("xyz".into())).into();
        assert_eq!(response.status, ExportStatus::Error);
        assert_eq!(response.file_url, None);
        assert!(response.message.contains("xyz"));
    }
}
