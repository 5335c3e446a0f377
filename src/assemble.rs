//! Content assembler – builds the shared HTML representation of one or more
//! portfolio records.
//!
//! The document is a fixed shell (title, "PAST AND CURRENT PROJECTS" heading,
//! intro paragraph) followed by one fragment per record, in input order, each
//! closed by a horizontal rule.
//!
//! Record text is HTML-escaped unless [`EscapeMode::Raw`] is configured.
//! Attribute values (image sources) are always escaped.

use std::fmt::{self, Write as _};

use crate::config::{EscapeMode, ExportConfig};
use crate::error::{ExportError, Result};
use crate::model::{text, PortfolioRecord};
use crate::store::RecordStore;

pub const DOCUMENT_HEADING: &str = "PAST AND CURRENT PROJECTS";
const DOCUMENT_TITLE: &str = "Portfolio: PAST AND CURRENT PROJECTS";
const INTRO: &str = "Here is a selection of projects we have worked on or are working on.";

/// Assembled HTML. Only lives between assembly and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument(String);

impl HtmlDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HtmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Load every named record, in order, before anything is rendered.
pub fn load_records(store: &dyn RecordStore, names: &[String]) -> Result<Vec<PortfolioRecord>> {
    if names.is_empty() {
        return Err(ExportError::InvalidInput(
            "no portfolio names provided".to_string(),
        ));
    }
    names
        .iter()
        .map(|name| {
            let record = store.load(name)?;
            log::debug!(
                "Loaded portfolio {name} ({} technologies, {} images)",
                record.technologies.len(),
                record.images.len()
            );
            Ok(record)
        })
        .collect()
}

/// Load the named records and assemble them into one HTML document.
pub fn assemble(
    store: &dyn RecordStore,
    names: &[String],
    config: &ExportConfig,
) -> Result<HtmlDocument> {
    let records = load_records(store, names)?;
    Ok(assemble_records(&records, config))
}

/// Assemble already-loaded records.
pub fn assemble_records(records: &[PortfolioRecord], config: &ExportConfig) -> HtmlDocument {
    let mut fragments = String::new();
    for record in records {
        write_fragment(&mut fragments, record, config);
    }

    let html = format!(
        "<html>\n<head>\n    <title>{DOCUMENT_TITLE}</title>\n</head>\n<body>\n    \
         <h1>{DOCUMENT_HEADING}</h1>\n    <p>{INTRO}</p>\n{fragments}</body>\n</html>\n"
    );
    HtmlDocument(html)
}

fn write_fragment(out: &mut String, record: &PortfolioRecord, config: &ExportConfig) {
    let t = |field: &Option<String>| embed(text(field), config.escape_mode);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "    <h3>{}</h3>", t(&record.title));
    for src in record.images.iter().filter_map(|image| image.source()) {
        let _ = writeln!(
            out,
            "    <img src=\"{}\" alt=\"Screenshot\" style=\"width:{}px;height:auto;\"><br>",
            escape_html(src),
            config.html_image_width_px
        );
    }
    let _ = writeln!(out, "    <p>Client: {}</p>", t(&record.client));
    let _ = writeln!(
        out,
        "    <p>Period: {} - {}</p>",
        t(&record.start_date),
        t(&record.end_date)
    );
    out.push_str("    <p>Technologies:</p>\n    <ul>\n");
    for tech in &record.technologies {
        let _ = writeln!(
            out,
            "        <li>{}</li>",
            embed(&tech.technology_name, config.escape_mode)
        );
    }
    out.push_str("    </ul>\n");
    let _ = writeln!(out, "    <p>Details: {}</p>", t(&record.body));
    let _ = writeln!(out, "    <p>URL: {}</p>", t(&record.website));
    let _ = writeln!(out, "    <p>Location: {}</p>", t(&record.location));
    out.push_str("    <hr>\n");
}

fn embed(value: &str, mode: EscapeMode) -> String {
    match mode {
        EscapeMode::Escape => escape_html(value),
        EscapeMode::Raw => value.to_string(),
    }
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PortfolioImage, Technology};
    use crate::store::MemoryRecordStore;

    fn record(name: &str, title: &str) -> PortfolioRecord {
        PortfolioRecord {
            title: Some(title.to_string()),
            client: Some("ACME".into()),
            start_date: Some("2021-01".into()),
            end_date: Some("2021-06".into()),
            technologies: vec![
                Technology {
                    technology_name: "GIS".into(),
                },
                Technology {
                    technology_name: "CAD".into(),
                },
            ],
            ..PortfolioRecord::new(name)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn one_heading_per_record_in_input_order() {
        let store: MemoryRecordStore = vec![
            record("PF-1", "Bridge Survey"),
            record("PF-2", "Harbour Dredging"),
            record("PF-3", "Rail Signalling"),
        ]
        .into_iter()
        .collect();

        let doc = assemble(&store, &names(&["PF-3", "PF-1", "PF-2"]), &ExportConfig::default())
            .unwrap();
        let html = doc.as_str();

        assert_eq!(html.matches("<h3>").count(), 3);
        assert_eq!(html.matches("<hr>").count(), 3);
        let rail = html.find("Rail Signalling").unwrap();
        let bridge = html.find("Bridge Survey").unwrap();
        let harbour = html.find("Harbour Dredging").unwrap();
        assert!(rail < bridge && bridge < harbour);
    }

    #[test]
    fn document_shell_and_fields() {
        let doc = assemble_records(&[record("PF-1", "Bridge Survey")], &ExportConfig::default());
        let html = doc.as_str();
        assert!(html.contains("<title>Portfolio: PAST AND CURRENT PROJECTS</title>"));
        assert!(html.contains("<h1>PAST AND CURRENT PROJECTS</h1>"));
        assert!(html.contains("<p>Client: ACME</p>"));
        assert!(html.contains("<p>Period: 2021-01 - 2021-06</p>"));
        let gis = html.find("<li>GIS</li>").unwrap();
        let cad = html.find("<li>CAD</li>").unwrap();
        assert!(gis < cad);
    }

    #[test]
    fn blank_images_produce_no_img_tags() {
        let mut rec = record("PF-1", "Bridge Survey");
        rec.images = vec![
            PortfolioImage {
                website_image: None,
            },
            PortfolioImage {
                website_image: Some("".into()),
            },
            PortfolioImage {
                website_image: Some("/files/deck.png".into()),
            },
        ];
        let html = assemble_records(&[rec], &ExportConfig::default()).into_string();
        assert_eq!(html.matches("<img").count(), 1);
        assert!(html.contains(r#"<img src="/files/deck.png" alt="Screenshot" style="width:300px;height:auto;"><br>"#));
        assert!(!html.contains(r#"src="""#));
    }

    #[test]
    fn free_text_is_escaped_by_default() {
        let mut rec = record("PF-1", "Q&A <Phase 2>");
        rec.body = Some("<script>alert('x')</script>".into());
        let html = assemble_records(&[rec], &ExportConfig::default()).into_string();
        assert!(html.contains("<h3>Q&amp;A &lt;Phase 2&gt;</h3>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn quotes_in_image_source_stay_inside_the_attribute() {
        let src = r#"/files/a"b'c.png" onerror="x"#;
        let mut rec = record("PF-1", "Bridge Survey");
        rec.images = vec![PortfolioImage {
            website_image: Some(src.into()),
        }];
        // Attributes are escaped in raw mode too.
        let config = ExportConfig {
            escape_mode: EscapeMode::Raw,
            ..ExportConfig::default()
        };
        let html = assemble_records(&[rec], &config).into_string();
        assert!(html.contains(
            r#"<img src="/files/a&quot;b&#39;c.png&quot; onerror=&quot;x" alt="Screenshot""#
        ));

        let blocks = crate::blocks::collect_blocks(&html);
        assert!(blocks.contains(&crate::blocks::Block::Image {
            src: src.to_string(),
            width_px: Some(300.0),
        }));
    }

    #[test]
    fn raw_mode_embeds_text_verbatim() {
        let mut rec = record("PF-1", "Bridge Survey");
        rec.body = Some("<b>bold</b> claim".into());
        let config = ExportConfig {
            escape_mode: EscapeMode::Raw,
            ..ExportConfig::default()
        };
        let html = assemble_records(&[rec], &config).into_string();
        assert!(html.contains("<p>Details: <b>bold</b> claim</p>"));
    }

    #[test]
    fn empty_name_list_is_invalid_input() {
        let store = MemoryRecordStore::new();
        assert!(matches!(
            assemble(&store, &[], &ExportConfig::default()),
            Err(ExportError::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_record_is_not_found() {
        let store = MemoryRecordStore::new().with(record("PF-1", "Bridge Survey"));
        assert!(matches!(
            assemble(&store, &names(&["PF-1", "PF-9"]), &ExportConfig::default()),
            Err(ExportError::NotFound(name)) if name == "PF-9"
        ));
    }
}
