// Pipeline Configuration
//
// Debounce window, flush thresholds, context capture limits and the
// location of the episode store. Loaded from TOML; every field has a default.

use crate::error::{EpisodicError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "EPISODIC_CONFIG";

/// Environment variable overriding the store directory
pub const STORE_DIR_ENV: &str = "EPISODIC_STORE_DIR";

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Enable/disable capture entirely
    pub enabled: bool,

    /// Quiet period after the last edit before a resource is flushed (in milliseconds)
    #[serde(with = "serde_duration_ms")]
    pub debounce: Duration,

    /// Minimum retained changes for an aggregate to become an episode
    pub min_changes: usize,

    /// Lines of context captured before and after the edited region (0 disables)
    pub context_lines: usize,

    /// Maximum characters kept per context string
    pub max_context_chars: usize,

    /// Directory holding persisted episodes, `None` disables persistence
    pub store_dir: Option<PathBuf>,

    /// Extra exclusion regexes matched against resource paths
    pub exclude_patterns: Vec<String>,

    /// Provenance tag written on every record
    pub provenance: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce: Duration::from_secs(5),
            min_changes: 1,
            context_lines: 3,
            max_context_chars: 500,
            store_dir: Some(default_store_dir()),
            exclude_patterns: Vec::new(),
            provenance: crate::types::EDIT_AGGREGATOR_PROVENANCE.to_string(),
        }
    }
}

// Custom serde module for Duration (serialize/deserialize as milliseconds)
mod serde_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Default episode store under the platform data directory
pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("episodic")
        .join("episodes")
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("episodic").join("config.toml"))
}

impl PipelineConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration from an explicit path, `EPISODIC_CONFIG`, the
    /// platform config directory, or defaults, then apply `EPISODIC_STORE_DIR`
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let mut config = match candidate {
            Some(path) if path.exists() => {
                debug!("Loading pipeline config from {}", path.display());
                Self::from_file(&path)?
            }
            Some(path) if explicit.is_some() => {
                return Err(EpisodicError::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            _ => Self::default(),
        };

        if let Ok(dir) = std::env::var(STORE_DIR_ENV) {
            if !dir.is_empty() {
                config.store_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.debounce.is_zero() {
            return Err(EpisodicError::InvalidConfig(
                "debounce must be at least 1 millisecond".to_string(),
            ));
        }

        if self.min_changes == 0 {
            return Err(EpisodicError::InvalidConfig(
                "min_changes must be at least 1".to_string(),
            ));
        }

        for (i, pattern) in self.exclude_patterns.iter().enumerate() {
            Regex::new(pattern).map_err(|e| {
                EpisodicError::InvalidConfig(format!("exclude_patterns[{i}] invalid regex: {e}"))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(config.enabled);
        assert_eq!(config.debounce, Duration::from_secs(5));
        assert_eq!(config.min_changes, 1);
        assert_eq!(config.context_lines, 3);
        assert_eq!(config.max_context_chars, 500);
        assert!(config.store_dir.is_some());
        assert_eq!(config.provenance, "edit_aggregator");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
debounce = 250
store_dir = "/tmp/episodes"
exclude_patterns = ["\\.generated\\."]
"#,
        )
        .unwrap();

        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/episodes")));
        assert_eq!(config.exclude_patterns.len(), 1);
        assert_eq!(config.min_changes, 1);
        assert_eq!(config.context_lines, 3);
    }

    #[test]
    fn test_validation_rejects_zero_debounce() {
        let err = PipelineConfig::from_toml("debounce = 0").unwrap_err();
        assert!(matches!(err, EpisodicError::InvalidConfig(_)));
    }

    #[test]
    fn test_validation_rejects_zero_min_changes() {
        let err = PipelineConfig::from_toml("min_changes = 0").unwrap_err();
        assert!(matches!(err, EpisodicError::InvalidConfig(_)));
    }

    #[test]
    fn test_validation_rejects_bad_regex() {
        let config = PipelineConfig {
            exclude_patterns: vec!["[invalid".into()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = PipelineConfig::from_toml("debounce = \"soon\"").unwrap_err();
        assert!(matches!(err, EpisodicError::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "min_changes = 3\ncontext_lines = 0\n").unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.min_changes, 3);
        assert_eq!(config.context_lines, 0);
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(PipelineConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = PipelineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.debounce, config.debounce);
        assert_eq!(parsed.store_dir, config.store_dir);
    }
}
