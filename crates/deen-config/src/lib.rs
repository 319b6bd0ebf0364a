use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use self::dictionary::DictionaryConfig;
use self::protocol::ProtocolConfig;
use self::search::SearchConfig;

pub mod dictionary;
pub mod protocol;
pub mod search;

fn default_cache_capacity() -> usize {
    10
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub dictionary: DictionaryConfig,
    pub search: SearchConfig,
    pub protocol: ProtocolConfig,

    /// Number of search results remembered per session
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dictionary: DictionaryConfig::default(),
            search: SearchConfig::default(),
            protocol: ProtocolConfig::default(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn new() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load a JSON profile; missing fields fall back to defaults, then the
    /// environment overrides are applied on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!("Loading config from {}", path.display());
        let data = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&data)?;
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("DEEN_DICT_URL") {
            self.dictionary.dict_url = url;
        }
        if let Ok(url) = env::var("DEEN_VERSION_URL") {
            self.dictionary.version_url = url;
        }
        if let Ok(dir) = env::var("DEEN_CACHE_DIR") {
            self.dictionary.cache_dir = PathBuf::from(dir);
        }
        if let Ok(value) = env::var("DEEN_SEARCH_TIMEOUT_MS") {
            self.protocol.search_timeout_ms =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "DEEN_SEARCH_TIMEOUT_MS".to_string(),
                    value,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_capacity, 10);
        assert_eq!(config.search.check_interval_lines, 500);
        assert_eq!(config.protocol.status_retries, 10);
        assert!(config.dictionary.dict_url.ends_with(".txt.gz"));
        assert!(config.dictionary.app_cache_name().starts_with("DeEnDict-"));
    }

    #[test]
    fn test_partial_profile_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"cache_capacity": 3, "search": {{"max_results": 7}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.cache_capacity, 3);
        assert_eq!(config.search.max_results, 7);
        assert_eq!(config.search.report_interval_ms, 100);
        assert_eq!(config.dictionary.cache_name, "DeEnDict");
    }

    #[test]
    fn test_bad_profile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ nope").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
