//! Flow layout – stacks content blocks top to bottom and splits them into
//! pages.
//!
//! Handles:
//! - heading / paragraph / bullet text wrapped to the content width
//! - text blocks split line-by-line across page boundaries
//! - images sized from their `width` style (CSS px), scaled to fit the page
//! - horizontal rules

use std::collections::HashMap;

use crate::blocks::Block;
use crate::fonts::wrap_text;
use crate::layout_config::*;

/// Heading font sizes in points, levels 1..=6.
const HEADING_SIZES: [f32; 6] = [22.0, 18.0, 15.0, 13.0, 12.0, 11.0];
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT_FACTOR: f32 = 1.3;
const BULLET_INDENT: f32 = 16.0;
const BLOCK_GAP: f32 = 6.0;
const TEXT_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const RULE_COLOR: [f32; 4] = [0.6, 0.6, 0.6, 1.0];
/// CSS pixels are 0.75 pt.
const PX_TO_PT: f32 = 0.75;
/// Width used for images without a `width` style (300 CSS px).
const DEFAULT_IMAGE_WIDTH_PT: f32 = 225.0;

/// Intrinsic pixel size of a resolved image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub px_width: u32,
    pub px_height: u32,
}

/// Page geometry for a layout run.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn content_bottom(&self) -> f32 {
        self.height - self.margin
    }
}

struct Flow {
    geometry: PageGeometry,
    pages: Vec<PageLayout>,
    current: Vec<LayoutBox>,
    /// Top of the next box, in page coordinates.
    y: f32,
}

impl Flow {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: Vec::new(),
            y: geometry.margin,
        }
    }

    fn remaining(&self) -> f32 {
        self.geometry.content_bottom() - self.y
    }

    fn page_is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn break_page(&mut self) {
        let boxes = std::mem::take(&mut self.current);
        self.pages.push(PageLayout {
            page_index: self.pages.len(),
            boxes,
        });
        self.y = self.geometry.margin;
    }

    /// Start a new page unless `height` fits (or the page is still empty).
    fn reserve(&mut self, height: f32) {
        if height > self.remaining() && !self.page_is_empty() {
            self.break_page();
        }
    }

    fn push(&mut self, lbox: LayoutBox, gap_after: f32) {
        self.y = lbox.y + lbox.height + gap_after;
        self.current.push(lbox);
    }

    fn place_text(&mut self, text: &str, font_size: f32, bold: bool, marker: Option<&str>) {
        let indent = if marker.is_some() { BULLET_INDENT } else { 0.0 };
        let x = self.geometry.margin + indent;
        let width = self.geometry.content_width() - indent;
        let line_height = font_size * LINE_HEIGHT_FACTOR;
        let mut lines = wrap_text(text, font_size, bold, width).into_iter().peekable();
        let mut first_chunk = true;

        while lines.peek().is_some() {
            let mut fits = (self.remaining() / line_height).floor() as usize;
            if fits == 0 {
                if self.page_is_empty() {
                    fits = 1;
                } else {
                    self.break_page();
                    continue;
                }
            }

            let chunk: Vec<TextLine> = lines
                .by_ref()
                .take(fits)
                .enumerate()
                .map(|(i, text)| TextLine {
                    text,
                    y_offset: i as f32 * line_height,
                })
                .collect();
            let height = chunk.len() as f32 * line_height;
            let more = lines.peek().is_some();

            let mut lbox = LayoutBox::new(x, self.y, width, height);
            lbox.text = Some(TextContent {
                lines: chunk,
                font_size,
                bold,
                color: TEXT_COLOR,
                line_height,
                list_marker: if first_chunk {
                    marker.map(str::to_string)
                } else {
                    None
                },
            });
            first_chunk = false;
            self.push(lbox, if more { 0.0 } else { BLOCK_GAP });
            if more {
                self.break_page();
            }
        }
    }

    fn place_image(&mut self, src: &str, width_px: Option<f32>, size: ImageSize) {
        let content_width = self.geometry.content_width();
        let content_height = self.geometry.content_bottom() - self.geometry.margin;
        let aspect = size.px_height as f32 / size.px_width.max(1) as f32;

        let mut width = width_px
            .map(|w| w * PX_TO_PT)
            .unwrap_or(DEFAULT_IMAGE_WIDTH_PT)
            .min(content_width);
        let mut height = width * aspect;
        if height > content_height {
            height = content_height;
            width = height / aspect;
        }

        self.reserve(height);
        let mut lbox = LayoutBox::new(self.geometry.margin, self.y, width, height);
        lbox.image = Some(ImageContent {
            src: src.to_string(),
            width,
            height,
        });
        self.push(lbox, BLOCK_GAP);
    }

    fn place_rule(&mut self) {
        let height = 1.0;
        self.reserve(height);
        let mut lbox = LayoutBox::new(
            self.geometry.margin,
            self.y,
            self.geometry.content_width(),
            height,
        );
        lbox.rule = Some(RuleStyle {
            thickness: 0.75,
            color: RULE_COLOR,
        });
        self.push(lbox, BLOCK_GAP * 2.0);
    }

    fn finish(mut self) -> Vec<PageLayout> {
        if !self.current.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

/// Lay out blocks on pages. Images missing from `images` are skipped.
pub fn layout_blocks(
    blocks: &[Block],
    images: &HashMap<String, ImageSize>,
    geometry: PageGeometry,
) -> Vec<PageLayout> {
    let mut flow = Flow::new(geometry);

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let size = HEADING_SIZES[usize::from((*level).clamp(1, 6)) - 1];
                flow.reserve(size * LINE_HEIGHT_FACTOR);
                flow.place_text(text, size, true, None);
            }
            Block::Paragraph { text } => flow.place_text(text, BODY_SIZE, false, None),
            Block::BulletItem { text } => {
                flow.place_text(text, BODY_SIZE, false, Some("\u{2022}"))
            }
            Block::Image { src, width_px } => match images.get(src) {
                Some(size) => flow.place_image(src, *width_px, *size),
                None => log::warn!("Skipping unresolved image {src}"),
            },
            Block::Rule => flow.place_rule(),
        }
    }

    flow.finish()
}
