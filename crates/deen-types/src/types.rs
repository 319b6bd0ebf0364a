use serde::{Deserialize, Serialize};

/// Top-level state of the worker context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    LoadingDict,
    Ready,
    Error,
}

/// Top-level state of the controller context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainState {
    Init,
    AwaitingDict,
    Ready,
    Searching,
    Error,
}

/// Size information about the loaded dictionary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictStats {
    /// Number of dictionary lines
    pub lines: usize,
    /// Sum of sub-entries over all lines
    pub entries: usize,
    /// Count of 1:1 translations, only known if the file's stats comment was consistent
    pub one_to_one: Option<usize>,
}

/// Lifecycle of a background dictionary refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Loading,
    Done,
    Error,
}

/// Messages sent from the worker to the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "dict-prog")]
    DictProgress { percent: f64 },
    #[serde(rename = "dict-upd")]
    DictUpdate { status: UpdateStatus, stats: DictStats },
    #[serde(rename = "worker-status")]
    WorkerStatus {
        state: WorkerState,
        stats: DictStats,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename = "search-prog")]
    SearchProgress { percent: f64 },
    #[serde(rename = "results")]
    Results {
        query: String,
        pattern: String,
        matches: Vec<String>,
    },
    #[serde(rename = "rand-line")]
    RandomLine { line: String },
}

/// Messages sent from the controller to the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MainMessage {
    #[serde(rename = "status-req")]
    StatusRequest,
    #[serde(rename = "search")]
    Search { what: String },
    #[serde(rename = "get-rand")]
    GetRandom,
}

/// Notifications from the controller to whatever renders results
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Controller state changed
    State(MainState),
    /// Dictionary download/decode progress in percent
    DictProgress(f64),
    /// Search scan progress in percent
    SearchProgress(f64),
    /// Informational stats text changed
    Stats {
        stats: DictStats,
        updating: Option<UpdateStatus>,
    },
    ShowResults {
        query: String,
        pattern: String,
        matches: Vec<String>,
        cached: bool,
    },
    ShowRandom(String),
    /// Search term was rejected locally
    Rejected { term: String, reason: String },
    /// Persistent error indicator, stays until restart
    Fatal(String),
    /// The controller stopped, nothing more will follow
    Shutdown,
}

/// Requests from the front end to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Navigate to a search term
    Search(String),
    Random,
    Back,
    Forward,
    /// Ask the worker for a fresh status
    Status,
    Quit,
}
