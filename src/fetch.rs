//! Image fetching – turns an `<img src>` reference into raw bytes.
//!
//! Supported references:
//! - `data:<mime>;base64,<data>` URIs, decoded locally
//! - absolute `http://` / `https://` URLs, fetched with a single blocking GET
//! - site-relative storage references (`/files/shot.png`), resolved against a
//!   configured site URL
//!
//! There is no retry: a failed request or non-2xx response is a
//! [`ExportError::Network`].

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::error::{ExportError, Result};

pub trait ImageFetcher {
    fn fetch(&self, src: &str) -> Result<Vec<u8>>;
}

impl<T: ImageFetcher + ?Sized> ImageFetcher for &T {
    fn fetch(&self, src: &str) -> Result<Vec<u8>> {
        (**self).fetch(src)
    }
}

/// Blocking fetcher backed by `ureq`.
pub struct HttpImageFetcher {
    agent: ureq::Agent,
    site_url: Option<String>,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            site_url: None,
        }
    }

    /// Base URL for site-relative references, e.g. `https://erp.example.com`.
    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        let url = site_url.into();
        self.site_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Resolve `src` to an absolute URL.
    pub fn resolve(&self, src: &str) -> Result<String> {
        if src.starts_with("http://") || src.starts_with("https://") {
            return Ok(src.to_string());
        }
        if src.starts_with('/') {
            return match &self.site_url {
                Some(base) => Ok(format!("{base}{src}")),
                None => Err(ExportError::network(
                    src,
                    "site-relative reference but no site URL is configured",
                )),
            };
        }
        Err(ExportError::network(src, "unsupported image reference"))
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, src: &str) -> Result<Vec<u8>> {
        if src.starts_with("data:") {
            return parse_data_uri(src).map_err(|e| ExportError::network(preview(src), e));
        }

        let url = self.resolve(src)?;
        log::debug!("Fetching image {url}");
        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ExportError::network(&url, e))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ExportError::network(&url, e))
    }
}

fn preview(src: &str) -> &str {
    match src.char_indices().nth(48) {
        Some((i, _)) => &src[..i],
        None => src,
    }
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
///
/// Returns `Err` if `src` is not a data URI or does not use base64 encoding.
pub fn parse_data_uri(src: &str) -> std::result::Result<Vec<u8>, String> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| format!("not a data URI: {:?}", preview(src)))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| "invalid data URI: missing `,` separator".to_string())?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}
