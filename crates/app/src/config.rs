use serde::Deserialize;
use std::path::{Path, PathBuf};
use tally_core::Money;
use tally_import::{HighValueOverride, SourceProfile, DEFAULT_CHOICES};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of `tally.toml`. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub csv_folder: PathBuf,
    pub rules_file: PathBuf,
    pub database: PathBuf,
    pub table: String,
    /// Menu offered when a merchant matches no rule.
    pub categories: Vec<String>,
    #[serde(rename = "override")]
    pub high_value: OverrideConfig,
    /// Replaces the built-in source profiles when non-empty.
    pub sources: Vec<SourceProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            csv_folder: PathBuf::from("csv"),
            rules_file: PathBuf::from("categorization_config.toml"),
            database: PathBuf::from("financial_tracker.db"),
            table: "financial_transactions".to_string(),
            categories: DEFAULT_CHOICES.iter().map(|c| c.to_string()).collect(),
            high_value: OverrideConfig::default(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OverrideConfig {
    pub enabled: bool,
    pub source_tag: String,
    pub threshold: Money,
    pub category: String,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        let HighValueOverride {
            source_tag,
            threshold,
            category,
        } = HighValueOverride::default();
        Self {
            enabled: true,
            source_tag,
            threshold,
            category,
        }
    }
}

impl OverrideConfig {
    pub fn rule(&self) -> Option<HighValueOverride> {
        self.enabled.then(|| HighValueOverride {
            source_tag: self.source_tag.clone(),
            threshold: self.threshold,
            category: self.category.clone(),
        })
    }
}

impl AppConfig {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &text)
    }

    /// Loads `explicit` when given, which must exist. Otherwise the default
    /// file is read if present, falling back to built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load(path)
                } else {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn profiles(&self) -> Vec<SourceProfile> {
        if self.sources.is_empty() {
            SourceProfile::builtin()
        } else {
            self.sources.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::SourceFormat;

    fn parse(text: &str) -> AppConfig {
        AppConfig::from_toml(Path::new("tally.toml"), text).unwrap()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse("");
        assert_eq!(config.csv_folder, PathBuf::from("csv"));
        assert_eq!(config.table, "financial_transactions");
        assert_eq!(config.categories.len(), DEFAULT_CHOICES.len());
        assert_eq!(config.high_value.rule(), Some(HighValueOverride::default()));
        assert_eq!(config.profiles().len(), 3);
    }

    #[test]
    fn partial_override_table_keeps_other_defaults() {
        let config = parse(
            r#"
            table = "spend"
            categories = ["Food", "Rent"]

            [override]
            threshold = "250"
            "#,
        );
        assert_eq!(config.table, "spend");
        assert_eq!(config.categories, ["Food", "Rent"]);
        let rule = config.high_value.rule().unwrap();
        assert_eq!(rule.source_tag, "costco-");
        assert_eq!(rule.threshold, Money::from_cents(250_00));
        assert_eq!(rule.category, "Shopping");
    }

    #[test]
    fn override_can_be_disabled() {
        let config = parse("[override]\nenabled = false\n");
        assert_eq!(config.high_value.rule(), None);
    }

    #[test]
    fn sources_replace_builtins() {
        let config = parse(
            r#"
            [[sources]]
            format = { custom = "chase" }
            file_name = "chase.csv"
            date_column = "Posting Date"
            description_column = "Description"
            amount = { kind = "single", column = "Amount" }
            amount_multiplier = -1
            date_format = "%m/%d/%Y"
            "#,
        );
        let profiles = config.profiles();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].format, SourceFormat::Custom("chase".into()));
        assert_eq!(profiles[0].file_name, "chase.csv");
    }

    #[test]
    fn bad_toml_names_the_file() {
        let err = AppConfig::from_toml(Path::new("broken.toml"), "table = [").unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::discover(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "csv_folder = \"statements\"\n").unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.csv_folder, PathBuf::from("statements"));
    }
}
