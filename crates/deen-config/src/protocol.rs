use serde::{Deserialize, Serialize};

fn default_status_retries() -> u32 {
    10
}

fn default_status_backoff_ms() -> u64 {
    500
}

fn default_search_timeout_ms() -> u64 {
    20_000
}

/// Controller side timing of the worker protocol
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProtocolConfig {
    /// How often a status request is sent before giving up on the worker
    #[serde(default = "default_status_retries")]
    pub status_retries: u32,
    #[serde(default = "default_status_backoff_ms")]
    pub status_backoff_ms: u64,
    /// Applies to both search and random-entry requests
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            status_retries: default_status_retries(),
            status_backoff_ms: default_status_backoff_ms(),
            search_timeout_ms: default_search_timeout_ms(),
        }
    }
}
