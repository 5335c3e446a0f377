//! Shared DOCX building helpers for the editable and fixed-template renderers.

use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Run, RunFonts, Style, StyleType};

use crate::error::{ExportError, Result};

/// Heading sizes in points, levels 1..=6.
const HEADING_SIZES: [usize; 6] = [20, 16, 14, 12, 11, 11];

pub const BODY_FONT: &str = "Calibri";

/// A new document with `Heading1`..`Heading6` and `ListBullet` styles defined.
pub fn new_document() -> Docx {
    let mut docx = Docx::new();
    for (i, size) in HEADING_SIZES.iter().enumerate() {
        let level = i + 1;
        docx = docx.add_style(
            Style::new(&format!("Heading{level}"), StyleType::Paragraph)
                .name(&format!("heading {level}"))
                .size(size * 2), // OOXML uses half-points
        );
    }
    docx.add_style(Style::new("ListBullet", StyleType::Paragraph).name("List Bullet"))
}

pub fn heading_paragraph(text: &str, level: u8) -> Paragraph {
    let level = level.clamp(1, 6);
    Paragraph::new()
        .style(&format!("Heading{level}"))
        .add_run(Run::new().add_text(text).bold())
}

pub fn body_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(body_run(text))
}

pub fn body_run(text: &str) -> Run {
    Run::new()
        .add_text(text)
        .fonts(RunFonts::new().ascii(BODY_FONT))
}

/// Serialise to DOCX bytes.
pub fn pack(docx: Docx) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| ExportError::Render(format!("DOCX packaging failed: {e}")))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_document_is_a_zip() {
        let bytes = pack(new_document().add_paragraph(body_paragraph("hello"))).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }
}
