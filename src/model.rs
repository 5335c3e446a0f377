//! Portfolio records as loaded from the record store.
//!
//! Records are read-only inputs: the pipeline never mutates them. Free-text
//! and numeric-ish fields are kept as optional strings so that a record with
//! a missing value renders an empty cell rather than failing.

use serde::{Deserialize, Deserializer, Serialize};

/// A project case study with its child collections fully loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioRecord {
    /// Unique key the record is looked up by.
    pub name: String,
    pub title: Option<String>,
    pub client: Option<String>,
    pub location: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub start_date: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub end_date: Option<String>,
    pub body: Option<String>,
    pub website: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub approximate_contract_value: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub duration_of_assignment: Option<String>,
    pub contact: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub total_staff_months: Option<String>,
    pub services_listed: Option<String>,
    /// Parent project; the fixed template reads its client from here.
    pub project: Option<ProjectRef>,
    pub technologies: Vec<Technology>,
    pub images: Vec<PortfolioImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRef {
    pub name: Option<String>,
    pub client: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub technology_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioImage {
    /// URL or storage reference; may be absent or blank.
    #[serde(default)]
    pub website_image: Option<String>,
}

impl PortfolioImage {
    /// The image reference, or `None` when it is null or blank.
    pub fn source(&self) -> Option<&str> {
        self.website_image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl PortfolioRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Client of the parent project, as used by the fixed template.
    pub fn project_client(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.client.as_deref())
    }
}

/// Field text or the empty string.
pub(crate) fn text(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("")
}

/// Accept `"12"`, `12`, `12.5` or `null` for fields the record store may
/// hold as either text or numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_fields_accept_numbers_and_strings() {
        let json = r#"{
            "name": "PF-0001",
            "approximate_contract_value": 125000,
            "duration_of_assignment": "18",
            "total_staff_months": null
        }"#;
        let record: PortfolioRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.approximate_contract_value.as_deref(), Some("125000"));
        assert_eq!(record.duration_of_assignment.as_deref(), Some("18"));
        assert_eq!(record.total_staff_months, None);
        assert!(record.technologies.is_empty());
    }

    #[test]
    fn blank_image_reference_has_no_source() {
        let blank = PortfolioImage {
            website_image: Some("   ".into()),
        };
        let missing = PortfolioImage::default();
        let present = PortfolioImage {
            website_image: Some("/files/a.png".into()),
        };
        assert_eq!(blank.source(), None);
        assert_eq!(missing.source(), None);
        assert_eq!(present.source(), Some("/files/a.png"));
    }

    #[test]
    fn project_client_reads_parent() {
        let mut record = PortfolioRecord::new("PF-0002");
        assert_eq!(record.project_client(), None);
        record.project = Some(ProjectRef {
            name: Some("PRJ-1".into()),
            client: Some("Ministry of Works".into()),
        });
        assert_eq!(record.project_client(), Some("Ministry of Works"));
    }
}
