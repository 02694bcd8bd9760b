//! Configuration file support for liftplan.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liftplan/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub propagation: PropagationConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl DataConfig {
    /// Path of the save journal under the data directory.
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("journal").join("saves.jsonl")
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Forward propagation behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// When true, weight deltas stop at the logged week's block boundary.
    /// Off by default: deltas reach every future week for the athlete.
    #[serde(default = "default_within_block_only")]
    pub within_block_only: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            within_block_only: default_within_block_only(),
        }
    }
}

/// Weekly summary email contents
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Cap on exercises listed per day in the summary body.
    #[serde(default = "default_max_exercises_per_day")]
    pub max_exercises_per_day: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            subject_prefix: default_subject_prefix(),
            max_exercises_per_day: default_max_exercises_per_day(),
        }
    }
}

/// Email delivery configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Where the outbox mailer drops rendered messages.
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            outbox_dir: default_outbox_dir(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME")
            .expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("liftplan")
}

fn default_within_block_only() -> bool {
    false
}

fn default_subject_prefix() -> String {
    "Weekly training summary:".to_string()
}

fn default_max_exercises_per_day() -> usize {
    8
}

fn default_outbox_dir() -> PathBuf {
    default_data_dir().join("outbox")
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME")
                .expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("liftplan").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.propagation.within_block_only);
        assert_eq!(config.summary.max_exercises_per_day, 8);
        assert!(config.summary.subject_prefix.contains("summary"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(
            config.propagation.within_block_only,
            parsed.propagation.within_block_only
        );
        assert_eq!(
            config.summary.subject_prefix,
            parsed.summary.subject_prefix
        );
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[propagation]
within_block_only = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.propagation.within_block_only);
        assert_eq!(config.summary.max_exercises_per_day, 8); // default
    }

    #[test]
    fn test_journal_path_under_data_dir() {
        let mut config = Config::default();
        config.data.data_dir = PathBuf::from("/tmp/liftplan-test");
        assert_eq!(
            config.data.journal_path(),
            PathBuf::from("/tmp/liftplan-test/journal/saves.jsonl")
        );
    }
}
