//! Document-order walk of a parsed HTML tree into flat content blocks.
//!
//! Matched elements: `h1`-`h6`, `p`, `ul`, `img` and `hr`. A `ul` emits one
//! bullet per direct `li` child and is not descended into further, so list
//! items are never emitted twice. `li` elements outside a `ul` are not
//! emitted themselves; their children are still walked.

use serde::{Deserialize, Serialize};

use crate::dom::{parse_html, DomNode, ElementNode, Tag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    BulletItem { text: String },
    /// `width_px` comes from the inline `width` style, when present.
    Image { src: String, width_px: Option<f32> },
    Rule,
}

/// Parse `html` and collect its blocks in document order.
pub fn collect_blocks(html: &str) -> Vec<Block> {
    let nodes = parse_html(html);
    let mut blocks = Vec::new();
    walk(&nodes, &mut blocks);
    blocks
}

fn walk(nodes: &[DomNode], blocks: &mut Vec<Block>) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            visit(e, blocks);
        }
    }
}

fn visit(e: &ElementNode, blocks: &mut Vec<Block>) {
    match &e.tag {
        Tag::H(level) => {
            blocks.push(Block::Heading {
                level: *level,
                text: e.text_content().trim().to_string(),
            });
            walk(&e.children, blocks);
        }
        Tag::P => {
            blocks.push(Block::Paragraph {
                text: e.text_content().trim().to_string(),
            });
            walk(&e.children, blocks);
        }
        Tag::Ul => {
            for li in e.child_elements(&Tag::Li) {
                blocks.push(Block::BulletItem {
                    text: li.text_content().trim().to_string(),
                });
            }
        }
        Tag::Img => match e.src().map(str::trim) {
            Some(src) if !src.is_empty() => blocks.push(Block::Image {
                src: src.to_string(),
                width_px: e.style_px("width"),
            }),
            _ => log::debug!("Skipping <img> without a source"),
        },
        Tag::Hr => blocks.push(Block::Rule),
        // Head content (title, meta) is document metadata, not body text.
        Tag::Head => {}
        _ => walk(&e.children, blocks),
    }
}
