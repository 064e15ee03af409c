//! Answer history
//!
//! Remembers recent answers per workflow and field so the next run can offer
//! them as defaults. Written only after a collection succeeds.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// workflow_id -> field key -> values, most recent first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    workflows: HashMap<String, HashMap<String, Vec<String>>>,
}

/// Get the path to the history file
pub fn history_file_path() -> PathBuf {
    use directories::ProjectDirs;

    if let Some(proj_dirs) = ProjectDirs::from("com", "labflow", "labflow") {
        proj_dirs.data_dir().join("history.json")
    } else {
        PathBuf::from(".labflow-history.json")
    }
}

impl History {
    /// Load history from disk; a missing or unreadable file starts empty
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt history file");
                History::default()
            }),
            Err(_) => History::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write history: {}", path.display()))?;
        Ok(())
    }

    /// Most recent answer for a field
    pub fn latest(&self, workflow_id: &str, key: &str) -> Option<&str> {
        self.workflows
            .get(workflow_id)?
            .get(key)?
            .first()
            .map(String::as_str)
    }

    /// Put `value` at the front of the field's history, keeping `limit` values
    pub fn record(&mut self, workflow_id: &str, key: &str, value: &str, limit: usize) {
        if value.is_empty() {
            return;
        }

        let field_history = self
            .workflows
            .entry(workflow_id.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();

        // Move to front
        if let Some(pos) = field_history.iter().position(|v| v == value) {
            field_history.remove(pos);
        }
        field_history.insert(0, value.to_string());
        field_history.truncate(limit);
    }
}
