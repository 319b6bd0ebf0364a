use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ftp.tu-chemnitz.de sends CORS headers and permits this use
fn default_dict_url() -> String {
    "https://ftp.tu-chemnitz.de/pub/Local/urz/ding/de-en-devel/de-en.txt.gz".to_string()
}

fn default_version_url() -> String {
    "https://ftp.tu-chemnitz.de/pub/Local/urz/ding/de-en-devel/sha256sums.txt".to_string()
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("deen-cache")
}

fn default_cache_name() -> String {
    "DeEnDict".to_string()
}

fn default_app_cache_prefix() -> String {
    "DeEnDict-".to_string()
}

fn default_update_check_delay_ms() -> u64 {
    500
}

fn default_fetch_timeout_secs() -> u64 {
    300
}

fn default_stats_scan_lines() -> usize {
    50
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Gzip-compressed dictionary text
    #[serde(default = "default_dict_url")]
    pub dict_url: String,
    /// Small file whose content changes whenever the dictionary does
    #[serde(default = "default_version_url")]
    pub version_url: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Cache partition holding the dictionary and its version marker
    #[serde(default = "default_cache_name")]
    pub cache_name: String,
    /// Prefix of the versioned application cache partition
    #[serde(default = "default_app_cache_prefix")]
    pub app_cache_prefix: String,
    /// Delay before the background version check after serving a cached copy
    #[serde(default = "default_update_check_delay_ms")]
    pub update_check_delay_ms: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// How many raw lines at the top of the file may carry the stats comment
    #[serde(default = "default_stats_scan_lines")]
    pub stats_scan_lines: usize,
}

impl DictionaryConfig {
    /// Name of the application cache partition for this build
    pub fn app_cache_name(&self) -> String {
        format!("{}{}", self.app_cache_prefix, env!("CARGO_PKG_VERSION"))
    }
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            dict_url: default_dict_url(),
            version_url: default_version_url(),
            cache_dir: default_cache_dir(),
            cache_name: default_cache_name(),
            app_cache_prefix: default_app_cache_prefix(),
            update_check_delay_ms: default_update_check_delay_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            stats_scan_lines: default_stats_scan_lines(),
        }
    }
}
