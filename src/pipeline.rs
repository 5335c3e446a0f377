//! Pipeline – the default HTML → PDF converter. Ties together parsing, image
//! resolution, flow layout and rendering into a single function call.
//!
//! The exporter only sees the [`HtmlToPdf`] trait, so any other converter can
//! be swapped in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::blocks::{collect_blocks, Block};
use crate::error::Result;
use crate::fetch::ImageFetcher;
use crate::layout::{layout_blocks, ImageSize, PageGeometry};
use crate::layout_config::LayoutConfig;
use crate::render::{render_pdf, ResolvedImage};

/// Opaque HTML → PDF conversion.
pub trait HtmlToPdf {
    fn convert(&self, html: &str) -> Result<Vec<u8>>;
}

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Configuration for the PDF generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Page width in points (default: A4 = 595.28).
    pub page_width: f32,
    /// Page height in points (default: A4 = 841.89).
    pub page_height: f32,
    /// Page margin in points (default: 40).
    pub page_margin: f32,
    /// Page orientation; swaps effective width/height when `Landscape`.
    pub orientation: PageOrientation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "Portfolio: PAST AND CURRENT PROJECTS".to_string(),
            page_width: 595.28,
            page_height: 841.89,
            page_margin: 40.0,
            orientation: PageOrientation::Portrait,
        }
    }
}

impl PipelineConfig {
    /// Effective page width after applying orientation.
    pub fn effective_width(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_width,
            PageOrientation::Landscape => self.page_height,
        }
    }

    /// Effective page height after applying orientation.
    pub fn effective_height(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_height,
            PageOrientation::Landscape => self.page_width,
        }
    }

    fn geometry(&self) -> PageGeometry {
        PageGeometry {
            width: self.effective_width(),
            height: self.effective_height(),
            margin: self.page_margin,
        }
    }
}

/// Fetch and decode every image the blocks reference.
///
/// Failures are logged and the image left out; the layout then skips it.
pub fn resolve_images(blocks: &[Block], fetcher: &dyn ImageFetcher) -> HashMap<String, ResolvedImage> {
    let mut resolved = HashMap::new();
    for block in blocks {
        let Block::Image { src, .. } = block else {
            continue;
        };
        if resolved.contains_key(src) {
            continue;
        }
        let bytes = match fetcher.fetch(src) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Skipping image – {e}");
                continue;
            }
        };
        // Decode with the `image` crate to obtain pixel dimensions.
        let decoded = match image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("Skipping image {src} – decode error: {e}");
                continue;
            }
        };
        let size = ImageSize {
            px_width: decoded.width(),
            px_height: decoded.height(),
        };
        resolved.insert(src.clone(), ResolvedImage { bytes, size });
    }
    resolved
}

/// Generate only the layout config (no PDF rendering) – useful for testing.
pub fn compute_layout_config(
    html: &str,
    config: &PipelineConfig,
    images: &HashMap<String, ResolvedImage>,
) -> LayoutConfig {
    let blocks = collect_blocks(html);
    layout(&blocks, config, images)
}

fn layout(
    blocks: &[Block],
    config: &PipelineConfig,
    images: &HashMap<String, ResolvedImage>,
) -> LayoutConfig {
    let sizes: HashMap<String, ImageSize> = images
        .iter()
        .map(|(src, img)| (src.clone(), img.size))
        .collect();
    LayoutConfig {
        title: config.title.clone(),
        page_width_pt: config.effective_width(),
        page_height_pt: config.effective_height(),
        pages: layout_blocks(blocks, &sizes, config.geometry()),
    }
}

/// Full pipeline: HTML string → PDF bytes.
///
/// Returns `(pdf_bytes, layout_config)`.
pub fn generate_pdf(
    html: &str,
    config: &PipelineConfig,
    fetcher: &dyn ImageFetcher,
) -> Result<(Vec<u8>, LayoutConfig)> {
    let blocks = collect_blocks(html);
    let images = resolve_images(&blocks, fetcher);
    let layout_config = layout(&blocks, config, &images);
    let pdf_bytes = render_pdf(&layout_config, &images)?;
    log::debug!(
        "Rendered PDF: {} pages, {} bytes",
        layout_config.pages.len(),
        pdf_bytes.len()
    );
    Ok((pdf_bytes, layout_config))
}

/// [`HtmlToPdf`] backed by this crate's flow layout and `printpdf`.
pub struct FlowPdfConverter<F> {
    config: PipelineConfig,
    fetcher: F,
}

impl<F: ImageFetcher> FlowPdfConverter<F> {
    pub fn new(config: PipelineConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }
}

impl<F: ImageFetcher> HtmlToPdf for FlowPdfConverter<F> {
    fn convert(&self, html: &str) -> Result<Vec<u8>> {
        generate_pdf(html, &self.config, &self.fetcher).map(|(bytes, _)| bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpImageFetcher;

    #[test]
    fn pipeline_basic() {
        let html = "<h1>Hello</h1><p>World</p>";
        let (bytes, config) =
            generate_pdf(html, &PipelineConfig::default(), &HttpImageFetcher::default()).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(config.pages.len(), 1);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn landscape_swaps_page_dimensions() {
        let config = PipelineConfig {
            orientation: PageOrientation::Landscape,
            ..PipelineConfig::default()
        };
        let layout = compute_layout_config("<p>Wide</p>", &config, &HashMap::new());
        assert!(layout.page_width_pt > layout.page_height_pt);
    }

    #[test]
    fn unreachable_images_do_not_fail_the_pdf() {
        let html = r#"<p>Before</p><img src="/files/missing.png"><p>After</p>"#;
        let (bytes, layout) =
            generate_pdf(html, &PipelineConfig::default(), &HttpImageFetcher::default()).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
        assert_eq!(layout.box_count(), 2);
    }
}
