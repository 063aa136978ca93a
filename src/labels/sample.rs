use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{normalize_drug_name, render_sections, LabelError};

/// Section body: a single paragraph or a list of paragraphs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SectionText {
    One(String),
    Many(Vec<String>),
}

impl SectionText {
    fn lines(&self) -> Vec<String> {
        match self {
            SectionText::One(s) => vec![s.clone()],
            SectionText::Many(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SampleEntry {
    #[serde(default)]
    pub sections: HashMap<String, SectionText>,
}

/// Static label dataset keyed by normalized drug name.
#[derive(Debug, Clone, Default)]
pub struct SampleLabels {
    entries: HashMap<String, SampleEntry>,
}

impl SampleLabels {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, LabelError> {
        let raw: HashMap<String, SampleEntry> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .map(|(name, entry)| (normalize_drug_name(&name), entry))
            .collect();
        Ok(Self { entries })
    }

    /// Load the dataset; a missing or unreadable file gives an empty dataset.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No sample label dataset");
            return Self::empty();
        }

        let loaded = std::fs::read_to_string(path)
            .map_err(LabelError::from)
            .and_then(|json| Self::from_json(&json));

        match loaded {
            Ok(labels) => {
                tracing::info!(path = %path.display(), drugs = labels.len(), "Sample labels loaded");
                labels
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Sample labels unreadable");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rendered label text for `drug`, sections in name order.
    pub fn text_for(&self, drug: &str) -> Option<String> {
        let entry = self.entries.get(&normalize_drug_name(drug))?;

        let mut names: Vec<&String> = entry.sections.keys().collect();
        names.sort();

        let text = render_sections(
            names
                .into_iter()
                .map(|name| (name.as_str(), entry.sections[name].lines())),
        );
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "Warfarin": {"sections": {
            "warnings": ["Bleeding risk.", "Monitor INR."],
            "drug_interactions": "Antibiotics increase anticoagulant effect."
        }},
        "empty_drug": {"sections": {}}
    }"#;

    #[test]
    fn lookup_is_normalized_and_sections_sorted() {
        let labels = SampleLabels::from_json(DATASET).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(
            labels.text_for(" WARFARIN").unwrap(),
            "DRUG_INTERACTIONS:\nAntibiotics increase anticoagulant effect.\n\nWARNINGS:\nBleeding risk.\nMonitor INR."
        );
    }

    #[test]
    fn unknown_or_empty_drug_has_no_text() {
        let labels = SampleLabels::from_json(DATASET).unwrap();
        assert!(labels.text_for("aspirin").is_none());
        assert!(labels.text_for("empty drug").is_none());
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SampleLabels::load(&dir.path().join("absent.json")).is_empty());
    }

    #[test]
    fn load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(SampleLabels::load(&path).is_empty());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, DATASET).unwrap();
        assert!(SampleLabels::load(&path).text_for("warfarin").is_some());
    }
}
