use deen_types::{DictStats, WorkerMessage, WorkerState};

/// What the worker answers to a status request
#[derive(Clone, Debug, PartialEq)]
pub struct StatusReport {
    pub state: WorkerState,
    pub stats: DictStats,
    pub error: Option<String>,
}

impl StatusReport {
    pub fn ready(stats: DictStats) -> Self {
        Self {
            state: WorkerState::Ready,
            stats,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            state: WorkerState::Error,
            stats: DictStats::default(),
            error: Some(error),
        }
    }

    pub fn to_message(&self) -> WorkerMessage {
        WorkerMessage::WorkerStatus {
            state: self.state,
            stats: self.stats,
            error: self.error.clone(),
        }
    }
}

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            state: WorkerState::LoadingDict,
            stats: DictStats::default(),
            error: None,
        }
    }
}
