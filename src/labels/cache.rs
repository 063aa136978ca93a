use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_drug_name, LabelError};

/// One cached label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub text: String,
    /// Raw upstream record, when the label came from the API.
    #[serde(default)]
    pub raw: Option<serde_json::Value>,
    pub fetched_at: DateTime<Utc>,
}

/// File-backed label cache, one JSON file per normalized drug name.
///
/// No locking: concurrent writers for the same drug race and the last write
/// wins.
#[derive(Debug, Clone)]
pub struct LabelCache {
    dir: PathBuf,
}

impl LabelCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, drug: &str) -> PathBuf {
        self.dir.join(format!("{}.json", normalize_drug_name(drug)))
    }

    /// Cached entry for `drug`. Missing files are a plain miss; unreadable or
    /// corrupt files are logged and also treated as a miss.
    pub fn get(&self, drug: &str) -> Option<CacheEntry> {
        let path = self.path_for(drug);
        if !path.exists() {
            return None;
        }

        match read_entry(&path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    pub fn put(
        &self,
        drug: &str,
        text: &str,
        raw: Option<serde_json::Value>,
    ) -> Result<PathBuf, LabelError> {
        std::fs::create_dir_all(&self.dir)?;

        let entry = CacheEntry {
            text: text.to_string(),
            raw,
            fetched_at: Utc::now(),
        };
        let path = self.path_for(drug);
        std::fs::write(&path, serde_json::to_vec_pretty(&entry)?)?;

        tracing::debug!(drug = %drug, path = %path.display(), "Label cached");
        Ok(path)
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry, LabelError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
