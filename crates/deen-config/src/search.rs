use serde::{Deserialize, Serialize};

/* A slow search is roughly 10s for 200,000 lines, so 20,000 lines/s.
 * Checking the clock every 500 lines keeps the overhead low while still
 * allowing a report about every 25ms on such a machine. */
fn default_check_interval_lines() -> usize {
    500
}

fn default_initial_report_ms() -> u64 {
    500
}

fn default_report_interval_ms() -> u64 {
    100
}

fn default_max_results() -> usize {
    200
}

fn default_min_term_chars() -> usize {
    2
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    #[serde(default = "default_check_interval_lines")]
    pub check_interval_lines: usize,
    /// No progress report before this much time has passed
    #[serde(default = "default_initial_report_ms")]
    pub initial_report_ms: u64,
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
    /// Number of results the front end prints
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Shorter non-empty terms are rejected without asking the worker
    #[serde(default = "default_min_term_chars")]
    pub min_term_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            check_interval_lines: default_check_interval_lines(),
            initial_report_ms: default_initial_report_ms(),
            report_interval_ms: default_report_interval_ms(),
            max_results: default_max_results(),
            min_term_chars: default_min_term_chars(),
        }
    }
}
