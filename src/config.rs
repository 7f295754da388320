//! Configuration Management
//!
//! Persistent defaults for cloudinv, read from
//! `<config dir>/cloudinv/config.json`. Command-line flags override them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default GCP project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// GCP regions to query instead of every region that is up
    #[serde(default)]
    pub regions: Vec<String>,
    /// Azure subscription IDs to query instead of discovering them
    #[serde(default)]
    pub subscriptions: Vec<String>,
    /// Concurrency ceiling; 0 or negative means unbounded
    #[serde(default)]
    pub concurrency: Option<i64>,
    /// Default output path for JSON dumps
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudinv").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path; a missing or malformed file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective project (CLI > config > gcloud default)
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.project_id.clone())
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective concurrency (CLI > config > unbounded)
    pub fn effective_concurrency(&self, cli: Option<i64>) -> i64 {
        cli.or(self.concurrency).unwrap_or(0)
    }

    /// Get effective output path (CLI > config)
    pub fn effective_output(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf).or_else(|| self.output_path.clone())
    }
}

/// Read a whitespace-separated list of scope names (regions, subscription IDs)
pub fn read_list_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;

    Ok(dedup_names(content.split_whitespace().map(str::to_string)))
}

/// Drop repeated scope names, keeping the first occurrence in place
pub fn dedup_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
