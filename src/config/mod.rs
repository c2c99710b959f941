//! Subsystem configuration: which deployments to scan, the failure policy,
//! and externally supplied per-unit properties.

use crate::bootstrap::orchestrator::BootstrapOptions;
use crate::bootstrap::scan::build_filter;
use crate::bootstrap::settings::{EXTERNAL_PREFIX, ExternalProperties};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid scan detector '{filename}': {reason}")]
    InvalidDetector { filename: String, reason: String },
}

/// One `scan` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    /// Deployment name this detector applies to.
    pub filename: String,
    /// Globs over archive names; empty scans every archive.
    #[serde(default)]
    pub filter_on_name: Vec<String>,
    /// Registered unit types to use instead of scanning for descriptors.
    #[serde(default)]
    pub classes: Vec<String>,
}

impl DetectorConfig {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidDetector {
            filename: self.filename.clone(),
            reason,
        };

        if self.filename.trim().is_empty() {
            return Err(invalid("filename cannot be empty".into()));
        }
        if self.classes.iter().any(|c| c.trim().is_empty()) {
            return Err(invalid("class names cannot be empty".into()));
        }
        build_filter(&self.filter_on_name).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubsystemConfig {
    pub continue_on_failure: bool,
    pub scan: Vec<DetectorConfig>,
    pub properties: BTreeMap<String, String>,
}

impl SubsystemConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for detector in &self.scan {
            detector.validate()?;
        }

        let namespace = format!("{}.", EXTERNAL_PREFIX);
        for key in self.properties.keys() {
            if !key.starts_with(&namespace) {
                warn!("Property '{}' is outside the '{}' namespace and has no effect", key, namespace);
            }
        }
        Ok(())
    }

    pub fn options(&self) -> BootstrapOptions {
        BootstrapOptions {
            continue_on_failure: self.continue_on_failure,
        }
    }

    pub fn external_properties(&self) -> ExternalProperties {
        ExternalProperties::new(self.properties.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: SubsystemConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.continue_on_failure);
        assert!(config.scan.is_empty());
        assert_eq!(config.options(), BootstrapOptions::default());
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subsystem.json");
        fs::write(
            &path,
            r#"{
                "continue_on_failure": true,
                "scan": [{ "filename": "app.war", "filter_on_name": ["people-*.jar"] }],
                "properties": { "dbbootstrap.people.connection.username": "admin" }
            }"#,
        )
        .unwrap();

        let config = SubsystemConfig::load(&path).unwrap();
        assert!(config.options().continue_on_failure);
        assert_eq!(config.scan[0].filename, "app.war");
        assert!(!config.external_properties().is_empty());
    }

    #[test]
    fn test_invalid_detectors() {
        assert!(DetectorConfig::new("").validate().is_err());

        let mut bad_glob = DetectorConfig::new("app.war");
        bad_glob.filter_on_name = vec!["[".into()];
        assert!(matches!(
            bad_glob.validate(),
            Err(ConfigError::InvalidDetector { .. })
        ));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = SubsystemConfig::load(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "continue": true }"#).unwrap();
        assert!(matches!(SubsystemConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
