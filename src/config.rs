//! TOML configuration for clusters, renumbering and logging.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::structure::RenumberOptions;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StrataConfig {
    /// Cluster shape.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Renumbering layout parameters.
    #[serde(default)]
    pub renumber: RenumberOptions,
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shape of the simulated cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Number of workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_filter() -> String {
    "info".to_string()
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`StrataConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl StrataConfig {
    /// Loads the explicit path, or the default path when none is given.
    ///
    /// A missing file yields the defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let Some(path) = explicit.or_else(default_config_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&contents, &path)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, Path::new("<inline>"))
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: StrataConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.workers == 0 {
            return Err(ConfigError::Invalid("cluster.workers must be at least 1".into()));
        }
        if self.renumber.mid_degree_threshold > self.renumber.high_degree_threshold {
            return Err(ConfigError::Invalid(
                "renumber.mid_degree_threshold must not exceed renumber.high_degree_threshold"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// `<config dir>/strata/config.toml`, when a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("strata").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = StrataConfig::from_toml_str("").unwrap();
        assert_eq!(config, StrataConfig::default());
        assert_eq!(config.cluster.workers, 4);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn parses_every_section() {
        let config = StrataConfig::from_toml_str(
            r#"
            [cluster]
            workers = 8

            [renumber]
            high_degree_threshold = 64
            mid_degree_threshold = 4
            legacy_mode = true

            [logging]
            filter = "strata=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.cluster.workers, 8);
        assert_eq!(config.renumber.high_degree_threshold, 64);
        assert_eq!(config.renumber.mid_degree_threshold, 4);
        assert!(config.renumber.legacy_mode);
        assert_eq!(config.logging.filter, "strata=debug");
    }

    #[test]
    fn rejects_zero_workers_and_inverted_thresholds() {
        assert!(matches!(
            StrataConfig::from_toml_str("[cluster]\nworkers = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StrataConfig::from_toml_str(
                "[renumber]\nhigh_degree_threshold = 2\nmid_degree_threshold = 3\n"
            ),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn load_reads_explicit_file_and_tolerates_missing_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(
            StrataConfig::load(Some(path.clone())).unwrap(),
            StrataConfig::default()
        );
        fs::write(&path, "[cluster]\nworkers = 2\n").unwrap();
        assert_eq!(StrataConfig::load(Some(path)).unwrap().cluster.workers, 2);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[cluster\n").unwrap();
        let err = StrataConfig::load(Some(path)).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
