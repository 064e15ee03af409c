//! User settings
//!
//! Read from `--settings <file>` when given, otherwise from
//! `<config dir>/labflow/settings.yaml` if it exists. Missing keys fall back
//! to [`Settings::default`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rejected answers allowed per field before the run aborts
    pub max_attempts: u32,
    /// Offer previous answers as defaults and remember new ones
    pub history: bool,
    /// Values kept per field
    pub history_limit: usize,
    /// Extra resources to resolve credentials for before any stage runs
    pub protected_resources: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            history: true,
            history_limit: 10,
            protected_resources: Vec::new(),
        }
    }
}

impl Settings {
    /// Location of the settings file in the user's config directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "labflow", "labflow")
            .map(|dirs| dirs.config_dir().join("settings.yaml"))
    }

    /// Load settings. An explicit path must exist; the default one may not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }
}
