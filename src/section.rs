use serde::{Deserialize, Serialize};

/// Heading-anchored block of output. Subsections share the same shape.
///
/// Empty strings and empty lists are left out of the JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub heading: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<Section>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub list_items: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub contact_info: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub submission_link: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub study_types: Vec<StudyType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_documents: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyType {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl Section {
    pub fn with_heading(heading: &str) -> Self {
        Section {
            heading: heading.to_string(),
            ..Default::default()
        }
    }

    /// A section is emitted only if it carries a heading, content,
    /// subsections or list items.
    pub fn is_valid(&self) -> bool {
        !self.heading.is_empty()
            || !self.content.is_empty()
            || !self.subsections.is_empty()
            || !self.list_items.is_empty()
    }

    /// Space-join `text` onto the existing content.
    pub fn append_content(&mut self, text: &str) {
        let joined = format!("{} {}", self.content, text);
        self.content = joined.trim().to_string();
    }

    pub fn heading_opt(&self) -> Option<String> {
        if self.heading.is_empty() {
            None
        } else {
            Some(self.heading.clone())
        }
    }
}
