//! Markup → editable document (DOCX) renderer.
//!
//! The assembled HTML is walked in document order (see [`crate::blocks`]) and
//! each block is appended to an [`EditableDocument`]: headings at their level,
//! paragraphs, bullet items prefixed with a bullet glyph, and inline images.
//!
//! Images are fetched synchronously, one at a time, in document order. A
//! failed fetch or an undecodable image is handled per
//! [`ImageFailurePolicy`]; the default aborts the whole render.

use std::io::Cursor;

use docx_rs::{Paragraph, Pic, Run};
use serde::{Deserialize, Serialize};

use crate::blocks::{collect_blocks, Block};
use crate::config::{ExportConfig, ImageFailurePolicy};
use crate::docx::{body_paragraph, body_run, heading_paragraph, new_document, pack};
use crate::error::{ExportError, Result};
use crate::fetch::ImageFetcher;

/// English Metric Units per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;

pub const BULLET: &str = "\u{2022}";

/// A structured document ready to be packed as DOCX.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditableDocument {
    pub blocks: Vec<EditableBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditableBlock {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    BulletItem {
        text: String,
    },
    Image {
        src: String,
        px_width: u32,
        px_height: u32,
        width_emu: u32,
        height_emu: u32,
        /// PNG-encoded image data.
        #[serde(skip)]
        png: Vec<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Paragraph,
    BulletItem,
    Image,
}

impl EditableBlock {
    pub fn kind(&self) -> BlockKind {
        match self {
            EditableBlock::Heading { .. } => BlockKind::Heading,
            EditableBlock::Paragraph { .. } => BlockKind::Paragraph,
            EditableBlock::BulletItem { .. } => BlockKind::BulletItem,
            EditableBlock::Image { .. } => BlockKind::Image,
        }
    }
}

impl EditableDocument {
    pub fn kinds(&self) -> Vec<BlockKind> {
        self.blocks.iter().map(EditableBlock::kind).collect()
    }

    pub fn count(&self, kind: BlockKind) -> usize {
        self.blocks.iter().filter(|b| b.kind() == kind).count()
    }

    /// Serialise to DOCX bytes.
    pub fn to_docx(&self) -> Result<Vec<u8>> {
        let mut docx = new_document();
        for block in &self.blocks {
            docx = match block {
                EditableBlock::Heading { level, text } => {
                    docx.add_paragraph(heading_paragraph(text, *level))
                }
                EditableBlock::Paragraph { text } => docx.add_paragraph(body_paragraph(text)),
                EditableBlock::BulletItem { text } => docx.add_paragraph(
                    Paragraph::new()
                        .style("ListBullet")
                        .add_run(body_run(&format!("{BULLET} {text}"))),
                ),
                EditableBlock::Image {
                    png,
                    width_emu,
                    height_emu,
                    ..
                } => {
                    let pic = Pic::new(png).size(*width_emu, *height_emu);
                    docx.add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)))
                }
            };
        }
        pack(docx)
    }
}

/// Build the structured document for `html`, fetching images as they are met.
pub fn build_editable(
    html: &str,
    fetcher: &dyn ImageFetcher,
    config: &ExportConfig,
) -> Result<EditableDocument> {
    let mut doc = EditableDocument::default();

    for block in collect_blocks(html) {
        match block {
            Block::Heading { level, text } => {
                doc.blocks.push(EditableBlock::Heading { level, text });
            }
            Block::Paragraph { text } => doc.blocks.push(EditableBlock::Paragraph { text }),
            Block::BulletItem { text } => doc.blocks.push(EditableBlock::BulletItem { text }),
            Block::Image { src, .. } => {
                match load_image(&src, fetcher, config.image_width_inches) {
                    Ok(image) => doc.blocks.push(image),
                    Err(e) => match config.image_failure {
                        ImageFailurePolicy::Abort => return Err(e),
                        ImageFailurePolicy::Placeholder => {
                            log::warn!("Image replaced by placeholder – {e}");
                            doc.blocks.push(EditableBlock::Paragraph {
                                text: format!("[image unavailable: {src}]"),
                            });
                        }
                        ImageFailurePolicy::Skip => log::warn!("Skipping image – {e}"),
                    },
                }
            }
            // No counterpart in the editable output.
            Block::Rule => {}
        }
    }

    log::debug!("Built editable document with {} blocks", doc.blocks.len());
    Ok(doc)
}

/// Render `html` straight to DOCX bytes.
pub fn render_editable(
    html: &str,
    fetcher: &dyn ImageFetcher,
    config: &ExportConfig,
) -> Result<Vec<u8>> {
    build_editable(html, fetcher, config)?.to_docx()
}

fn load_image(src: &str, fetcher: &dyn ImageFetcher, width_inches: f64) -> Result<EditableBlock> {
    let bytes = fetcher.fetch(src)?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| ExportError::Render(format!("cannot decode image {src}: {e}")))?;
    let (px_width, px_height) = (decoded.width(), decoded.height());
    if px_width == 0 || px_height == 0 {
        return Err(ExportError::Render(format!("image {src} has no pixels")));
    }

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| ExportError::Render(format!("cannot re-encode image {src}: {e}")))?;

    let (width_emu, height_emu) = extent_emu(src, width_inches, px_width, px_height)?;

    Ok(EditableBlock::Image {
        src: src.to_string(),
        px_width,
        px_height,
        width_emu,
        height_emu,
        png,
    })
}

/// Display extent for an image `width_inches` wide, height following the
/// pixel aspect ratio. Extents that do not fit a DOCX `u32` are render errors.
fn extent_emu(src: &str, width_inches: f64, px_width: u32, px_height: u32) -> Result<(u32, u32)> {
    let width = (width_inches * EMU_PER_INCH).round();
    if !width.is_finite() || width < 1.0 || width > f64::from(u32::MAX) {
        return Err(ExportError::Render(format!(
            "image width of {width_inches} in is out of range for {src}"
        )));
    }
    let width_emu = width as u32;
    let height = u64::from(width_emu) * u64::from(px_height) / u64::from(px_width);
    let height_emu = u32::try_from(height).map_err(|_| {
        ExportError::Render(format!(
            "image {src} is too tall ({px_width}x{px_height} px) to embed"
        ))
    })?;
    Ok((width_emu, height_emu))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    struct StubFetcher {
        images: HashMap<String, Vec<u8>>,
    }

    impl ImageFetcher for StubFetcher {
        fn fetch(&self, src: &str) -> Result<Vec<u8>> {
            self.images
                .get(src)
                .cloned()
                .ok_or_else(|| ExportError::network(src, "404 Not Found"))
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn fetcher_with(src: &str, bytes: Vec<u8>) -> StubFetcher {
        StubFetcher {
            images: HashMap::from([(src.to_string(), bytes)]),
        }
    }

    const FRAGMENT: &str = r#"<h1>Projects</h1><p>First</p><p>Second</p>
        <ul><li>GIS</li><li>CAD</li><li>BIM</li></ul>
        <img src="https://cdn.test/a.png" style="width:300px;height:auto;">"#;

    #[test]
    fn fragment_maps_to_expected_blocks() {
        let fetcher = fetcher_with("https://cdn.test/a.png", png(8, 4));
        let doc = build_editable(FRAGMENT, &fetcher, &ExportConfig::default()).unwrap();

        assert_eq!(
            doc.kinds(),
            vec![
                BlockKind::Heading,
                BlockKind::Paragraph,
                BlockKind::Paragraph,
                BlockKind::BulletItem,
                BlockKind::BulletItem,
                BlockKind::BulletItem,
                BlockKind::Image,
            ]
        );
    }

    #[test]
    fn image_is_four_inches_wide_with_aspect_ratio() {
        let fetcher = fetcher_with("https://cdn.test/a.png", png(8, 4));
        let doc = build_editable(FRAGMENT, &fetcher, &ExportConfig::default()).unwrap();
        match doc.blocks.last() {
            Some(EditableBlock::Image {
                width_emu,
                height_emu,
                px_width,
                px_height,
                ..
            }) => {
                assert_eq!(*width_emu, 3_657_600);
                assert_eq!(*height_emu, 1_828_800);
                assert_eq!((*px_width, *px_height), (8, 4));
            }
            other => panic!("expected image block, got {other:?}"),
        }
    }

    #[test]
    fn fetch_failure_aborts_by_default() {
        let fetcher = StubFetcher {
            images: HashMap::new(),
        };
        let err = build_editable(FRAGMENT, &fetcher, &ExportConfig::default()).unwrap_err();
        assert!(matches!(err, ExportError::Network { .. }));
    }

    #[test]
    fn placeholder_policy_keeps_going() {
        let fetcher = StubFetcher {
            images: HashMap::new(),
        };
        let config = ExportConfig {
            image_failure: ImageFailurePolicy::Placeholder,
            ..ExportConfig::default()
        };
        let doc = build_editable(FRAGMENT, &fetcher, &config).unwrap();
        assert_eq!(doc.count(BlockKind::Image), 0);
        assert!(matches!(
            doc.blocks.last(),
            Some(EditableBlock::Paragraph { text }) if text == "[image unavailable: https://cdn.test/a.png]"
        ));
    }

    #[test]
    fn skip_policy_drops_the_image() {
        let fetcher = StubFetcher {
            images: HashMap::new(),
        };
        let config = ExportConfig {
            image_failure: ImageFailurePolicy::Skip,
            ..ExportConfig::default()
        };
        let doc = build_editable(FRAGMENT, &fetcher, &config).unwrap();
        assert_eq!(doc.blocks.len(), 6);
    }

    #[test]
    fn oversized_extent_is_a_render_error() {
        // 1x2000 px at 4 in wide would need a 7.3e9 EMU height.
        let fetcher = fetcher_with("https://cdn.test/a.png", png(1, 2000));
        let err = build_editable(FRAGMENT, &fetcher, &ExportConfig::default()).unwrap_err();
        assert!(matches!(err, ExportError::Render(msg) if msg.contains("too tall")));

        let config = ExportConfig {
            image_failure: ImageFailurePolicy::Skip,
            ..ExportConfig::default()
        };
        let doc = build_editable(FRAGMENT, &fetcher, &config).unwrap();
        assert_eq!(doc.count(BlockKind::Image), 0);
    }

    #[test]
    fn extent_rejects_unusable_widths() {
        assert_eq!(extent_emu("a", 4.0, 100, 4000).unwrap(), (3_657_600, 146_304_000));
        for width in [f64::NAN, f64::INFINITY, -1.0, 0.0, 1e9] {
            assert!(
                matches!(extent_emu("a", width, 8, 4), Err(ExportError::Render(_))),
                "width {width} accepted"
            );
        }
    }

    #[test]
    fn undecodable_image_is_a_render_error() {
        let fetcher = fetcher_with("https://cdn.test/a.png", b"not an image".to_vec());
        let err = build_editable(FRAGMENT, &fetcher, &ExportConfig::default()).unwrap_err();
        assert!(matches!(err, ExportError::Render(_)));
    }

    #[test]
    fn rendered_docx_is_a_zip_package() {
        let fetcher = fetcher_with("https://cdn.test/a.png", png(2, 2));
        let bytes = render_editable(FRAGMENT, &fetcher, &ExportConfig::default()).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }
}
