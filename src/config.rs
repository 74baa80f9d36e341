//! Engine configuration: batch sizes and process delays, loadable from TOML.
//! Mirrors `config::Config`'s `#[serde(default = "...")]` style.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{ExpirerError, Result};

fn default_repository_process_delay_hours() -> i64 {
    24
}

fn default_repository_batch_size() -> usize {
    100
}

fn default_upload_process_delay_hours() -> i64 {
    24
}

fn default_upload_batch_size() -> usize {
    100
}

fn default_commit_batch_size() -> usize {
    100
}

fn default_branches_cache_max_keys() -> usize {
    10_000
}

/// Batch sizes and delays governing one retention pass.
///
/// Durations are stored in hours in the serialized form (matching the TOML
/// style of small integer knobs elsewhere in this lineage) and exposed as
/// `chrono::Duration` through the accessor methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirerConfig {
    #[serde(default = "default_repository_process_delay_hours")]
    pub repository_process_delay_hours: i64,
    #[serde(default = "default_repository_batch_size")]
    pub repository_batch_size: usize,
    #[serde(default = "default_upload_process_delay_hours")]
    pub upload_process_delay_hours: i64,
    #[serde(default = "default_upload_batch_size")]
    pub upload_batch_size: usize,
    #[serde(default = "default_commit_batch_size")]
    pub commit_batch_size: usize,
    #[serde(default = "default_branches_cache_max_keys")]
    pub branches_cache_max_keys: usize,
}

impl Default for ExpirerConfig {
    fn default() -> Self {
        Self {
            repository_process_delay_hours: default_repository_process_delay_hours(),
            repository_batch_size: default_repository_batch_size(),
            upload_process_delay_hours: default_upload_process_delay_hours(),
            upload_batch_size: default_upload_batch_size(),
            commit_batch_size: default_commit_batch_size(),
            branches_cache_max_keys: default_branches_cache_max_keys(),
        }
    }
}

impl ExpirerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(ExpirerError::Io)?;
        toml::from_str(&raw).map_err(ExpirerError::TomlDe)
    }

    pub fn repository_process_delay(&self) -> Duration {
        Duration::hours(self.repository_process_delay_hours)
    }

    pub fn upload_process_delay(&self) -> Duration {
        Duration::hours(self.upload_process_delay_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = ExpirerConfig::default();
        assert_eq!(config.repository_process_delay(), Duration::hours(24));
        assert_eq!(config.repository_batch_size, 100);
        assert_eq!(config.upload_process_delay(), Duration::hours(24));
        assert_eq!(config.upload_batch_size, 100);
        assert_eq!(config.commit_batch_size, 100);
        assert_eq!(config.branches_cache_max_keys, 10_000);
    }

    #[test]
    fn partial_toml_fills_remaining_fields_with_defaults() {
        let config: ExpirerConfig = toml::from_str("repository_batch_size = 25\n").unwrap();
        assert_eq!(config.repository_batch_size, 25);
        assert_eq!(config.upload_batch_size, 100);
    }
}
