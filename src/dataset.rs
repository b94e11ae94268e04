//! Record store: the static incident dataset and the Documents derived from it.
//!
//! The file is a JSON object whose top-level key (normally `all_data`) holds
//! one group per person:
//!
//! ```json
//! {"all_data": [{"person": "X", "datas": [{"Incident": "..", "Conditions": "..", "Decision": ".."}]}]}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One incident entry as it appears in the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub person: String,
    pub incident: String,
    pub conditions: String,
    pub decision: String,
}

impl Record {
    pub fn to_document(&self) -> Document {
        Document {
            text: format!("{}\n{}\n{}", self.incident, self.conditions, self.decision),
            metadata: DocumentMetadata {
                person: self.person.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub person: String,
}

/// Unit of retrievable text, one per [`Record`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Reads and parses the dataset file, returning Documents in source order.
pub fn load(path: &Path, root_key: &str) -> Result<Vec<Document>, DatasetError> {
    let contents = fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&contents).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if value.get(root_key).is_none() {
        tracing::warn!(
            "Dataset {} has no '{}' key; starting with no documents",
            path.display(),
            root_key
        );
    }

    let documents = documents_from_value(&value, root_key);
    tracing::info!("Loaded {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

pub fn documents_from_value(value: &Value, root_key: &str) -> Vec<Document> {
    records_from_value(value, root_key)
        .iter()
        .map(Record::to_document)
        .collect()
}

/// Flattens person groups into records. Missing or non-string fields become "".
pub fn records_from_value(value: &Value, root_key: &str) -> Vec<Record> {
    let Some(groups) = value.get(root_key).and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for group in groups {
        let person = text_field(group, "person");
        let Some(entries) = group.get("datas").and_then(|v| v.as_array()) else {
            continue;
        };
        for entry in entries {
            records.push(Record {
                person: person.clone(),
                incident: text_field(entry, "Incident"),
                conditions: text_field(entry, "Conditions"),
                decision: text_field(entry, "Decision"),
            });
        }
    }
    records
}

fn text_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}
