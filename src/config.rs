//! Export configuration.
//!
//! Every field has a default, so an empty JSON object (or no config file at
//! all) reproduces the stock behaviour.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::pipeline::PipelineConfig;

/// How free-text record fields are embedded into the assembled HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeMode {
    /// HTML-escape every interpolated value.
    #[default]
    Escape,
    /// Insert values verbatim. Record text can then inject markup.
    Raw,
}

/// What the editable renderer does when an image cannot be fetched or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFailurePolicy {
    /// Abort the whole render.
    #[default]
    Abort,
    /// Emit a `[image unavailable: <src>]` paragraph in its place.
    Placeholder,
    /// Drop the image.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub escape_mode: EscapeMode,
    pub image_failure: ImageFailurePolicy,
    /// Display width of images in the editable document.
    pub image_width_inches: f64,
    /// Display width written into `<img style>` by the content assembler.
    pub html_image_width_px: u32,
    /// Per-request timeout for remote image fetches.
    pub fetch_timeout_secs: u64,
    /// Base URL for site-relative image references.
    pub site_url: Option<String>,
    /// Mark exported files private.
    pub private_files: bool,
    /// Default PDF converter settings.
    pub pdf: PipelineConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            escape_mode: EscapeMode::Escape,
            image_failure: ImageFailurePolicy::Abort,
            image_width_inches: 4.0,
            html_image_width_px: 300,
            fetch_timeout_secs: 30,
            site_url: None,
            private_files: true,
            pdf: PipelineConfig::default(),
        }
    }
}

impl ExportConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Deserialise from JSON and check value ranges.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ExportError::InvalidInput(format!("invalid export config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.image_width_inches.is_finite() || self.image_width_inches <= 0.0 {
            return Err(ExportError::InvalidInput(format!(
                "image_width_inches must be a positive number, got {}",
                self.image_width_inches
            )));
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ExportError::InvalidInput(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }
}
