//! Fixed-template renderer – the "World Bank" assignment-details report.
//!
//! Skips the HTML representation entirely. The document opens with a bold
//! "Assignment Details" title; each record then gets a level-2 heading with
//! its record name and a two-column, fourteen-row table whose captions are
//! fixed. Label and value columns have fixed widths in every table.
//!
//! The client name comes from the record's parent project, not from the
//! record's own `client` field.

use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow, WidthType};
use serde::{Deserialize, Serialize};

use crate::assemble::load_records;
use crate::docx::{body_paragraph, heading_paragraph, new_document, pack};
use crate::error::Result;
use crate::model::{text, PortfolioRecord};
use crate::store::RecordStore;

pub const DOCUMENT_TITLE: &str = "Assignment Details";

/// Label column width in twentieths of a point (2.5 in).
pub const LABEL_COLUMN_DXA: usize = 3600;
/// Value column width in twentieths of a point (4 in).
pub const VALUE_COLUMN_DXA: usize = 5760;

/// Where a row's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Title,
    ContractValue,
    Location,
    Duration,
    ProjectClient,
    Contact,
    StartDate,
    EndDate,
    TotalStaffMonths,
    ServicesListed,
    Body,
    AlwaysBlank,
}

const ROWS: [(&str, Source); 14] = [
    ("Assignment name:", Source::Title),
    (
        "Approx. value of the contract (in current US$):",
        Source::ContractValue,
    ),
    ("Country:", Source::Location),
    ("Duration of assignment (months):", Source::Duration),
    ("Name of Client:", Source::ProjectClient),
    ("Contact Person, Title/Designation, Tel. No./Address:", Source::Contact),
    ("Start Date (month/year):", Source::StartDate),
    ("End Date (month/year):", Source::EndDate),
    (
        "Total No. of staff-months of the assignment:",
        Source::TotalStaffMonths,
    ),
    (
        "No. of professional staff-months provided by your consulting firm:",
        Source::TotalStaffMonths,
    ),
    ("Name of associated Consultants, if any:", Source::AlwaysBlank),
    (
        "Name of senior professional staff of your firm involved and designation and/or functions performed:",
        Source::AlwaysBlank,
    ),
    ("Description of Project:", Source::Body),
    (
        "Description of actual services provided by your staff within the assignment:",
        Source::ServicesListed,
    ),
];

/// Row captions in table order.
pub fn captions() -> impl Iterator<Item = &'static str> {
    ROWS.iter().map(|(caption, _)| *caption)
}

fn value_of(record: &PortfolioRecord, source: Source) -> &str {
    match source {
        Source::Title => text(&record.title),
        Source::ContractValue => text(&record.approximate_contract_value),
        Source::Location => text(&record.location),
        Source::Duration => text(&record.duration_of_assignment),
        Source::ProjectClient => record.project_client().unwrap_or(""),
        Source::Contact => text(&record.contact),
        Source::StartDate => text(&record.start_date),
        Source::EndDate => text(&record.end_date),
        Source::TotalStaffMonths => text(&record.total_staff_months),
        Source::ServicesListed => text(&record.services_listed),
        Source::Body => text(&record.body),
        Source::AlwaysBlank => "",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRow {
    pub caption: String,
    pub value: String,
}

/// One record's heading and table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSection {
    /// The record name, not its title.
    pub heading: String,
    pub rows: Vec<TemplateRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedTemplateDocument {
    pub title: String,
    pub sections: Vec<AssignmentSection>,
}

impl FixedTemplateDocument {
    pub fn from_records(records: &[PortfolioRecord]) -> Self {
        let sections = records
            .iter()
            .map(|record| AssignmentSection {
                heading: record.name.clone(),
                rows: ROWS
                    .iter()
                    .map(|(caption, source)| TemplateRow {
                        caption: caption.to_string(),
                        value: value_of(record, *source).to_string(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            title: DOCUMENT_TITLE.to_string(),
            sections,
        }
    }

    /// Serialise to DOCX bytes.
    pub fn to_docx(&self) -> Result<Vec<u8>> {
        pack(self.build())
    }

    fn build(&self) -> Docx {
        let mut docx = new_document().add_paragraph(
            Paragraph::new()
                .style("Heading1")
                .add_run(Run::new().add_text(&self.title).bold()),
        );

        for section in &self.sections {
            docx = docx
                .add_paragraph(heading_paragraph(&section.heading, 2))
                .add_table(section_table(section));
        }
        docx
    }
}

fn section_table(section: &AssignmentSection) -> Table {
    let rows = section
        .rows
        .iter()
        .map(|row| {
            TableRow::new(vec![
                TableCell::new()
                    .add_paragraph(body_paragraph(&row.caption))
                    .width(LABEL_COLUMN_DXA, WidthType::Dxa),
                TableCell::new()
                    .add_paragraph(body_paragraph(&row.value))
                    .width(VALUE_COLUMN_DXA, WidthType::Dxa),
            ])
        })
        .collect();
    Table::new(rows).set_grid(vec![LABEL_COLUMN_DXA, VALUE_COLUMN_DXA])
}

/// Load the named records and render the fixed template as DOCX bytes.
pub fn render_fixed_template(store: &dyn RecordStore, names: &[String]) -> Result<Vec<u8>> {
    let records = load_records(store, names)?;
    FixedTemplateDocument::from_records(&records).to_docx()
}
