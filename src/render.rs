//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).

use std::collections::{HashMap, HashSet};

use printpdf::*;

use crate::error::Result;
use crate::layout::ImageSize;
use crate::layout_config::*;

/// Image bytes (PNG or JPEG) with their decoded pixel size.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    pub size: ImageSize,
}

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    size: ImageSize,
}

const PT_TO_MM: f32 = 0.352778;

/// Render a LayoutConfig into PDF bytes.
///
/// Image boxes whose `src` has no entry in `images`, or whose bytes printpdf
/// cannot decode, are skipped with a `log::warn`.
pub fn render_pdf(config: &LayoutConfig, images: &HashMap<String, ResolvedImage>) -> Result<Vec<u8>> {
    let page_w = Mm(config.page_width_pt * PT_TO_MM);
    let page_h = Mm(config.page_height_pt * PT_TO_MM);

    let mut doc = PdfDocument::new(&config.title);

    // ── Pre-register all images ────────────────────────────────────────────
    let srcs: HashSet<&str> = config
        .pages
        .iter()
        .flat_map(|p| &p.boxes)
        .filter_map(|b| b.image.as_ref())
        .map(|img| img.src.as_str())
        .collect();

    let mut resources: HashMap<&str, ImageResource> = HashMap::new();
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    for src in srcs {
        let Some(resolved) = images.get(src) else {
            log::warn!("Skipping image – no data for {src}");
            continue;
        };
        let raw = match RawImage::decode_from_bytes(&resolved.bytes, &mut warnings) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping image – PDF encode error for {src}: {e}");
                continue;
            }
        };
        resources.insert(
            src,
            ImageResource {
                xobj_id: doc.add_image(&raw),
                size: resolved.size,
            },
        );
    }

    // ── Render pages ──────────────────────────────────────────────────────
    let mut pages: Vec<PdfPage> = config
        .pages
        .iter()
        .map(|page_layout| {
            let mut ops = Vec::new();
            for lbox in &page_layout.boxes {
                render_box(&mut ops, lbox, config.page_height_pt, &resources);
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect();

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    Ok(doc.save(&PdfSaveOptions::default(), &mut Vec::new()))
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0xFF; printpdf passes these
    // bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn rgb(color: [f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: color[0],
        g: color[1],
        b: color[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn write_text(ops: &mut Vec<Op>, text: &str, x: f32, y: f32, size: f32, font: BuiltinFont, color: [f32; 4]) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Render one LayoutBox into PDF ops.
fn render_box(
    ops: &mut Vec<Op>,
    lbox: &LayoutBox,
    page_height: f32,
    images: &HashMap<&str, ImageResource>,
) {
    // PDF coordinate system: origin at bottom-left.
    // Our layout uses origin at top-left. Convert:
    let pdf_y = page_height - lbox.y;

    if let Some(rule) = &lbox.rule {
        let y = pdf_y - lbox.height / 2.0;
        ops.push(Op::SetOutlineColor { col: rgb(rule.color) });
        ops.push(Op::SetOutlineThickness {
            pt: Pt(rule.thickness),
        });
        ops.push(Op::DrawLine {
            line: Line {
                points: vec![point(lbox.x, y), point(lbox.x + lbox.width, y)],
                is_closed: false,
            },
        });
    }

    if let Some(text) = &lbox.text {
        let font = if text.bold {
            BuiltinFont::HelveticaBold
        } else {
            BuiltinFont::Helvetica
        };
        // Baseline ≈ top of line + ascender
        let ascender = crate::fonts::ascender(text.font_size);

        for tline in text.lines.iter().filter(|l| !l.text.is_empty()) {
            let text_y = pdf_y - tline.y_offset - ascender;
            write_text(ops, &tline.text, lbox.x, text_y, text.font_size, font, text.color);
        }

        if let Some(marker) = &text.list_marker {
            write_text(
                ops,
                marker,
                lbox.x - 12.0,
                pdf_y - ascender,
                text.font_size,
                BuiltinFont::Helvetica,
                text.color,
            );
        }
    }

    // Image – embed from pre-registered XObject
    if let Some(img) = &lbox.image {
        if let Some(res) = images.get(img.src.as_str()) {
            let img_bottom_y = page_height - lbox.y - img.height;

            // At dpi=72 printpdf renders 1 px = 1 pt, so
            // scale = desired_pt / px_dim.
            let scale_x = img.width / res.size.px_width.max(1) as f32;
            let scale_y = img.height / res.size.px_height.max(1) as f32;

            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(img_bottom_y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }
}
