use std::time::Duration;

use deen_config::Config;
use deen_config::protocol::ProtocolConfig;
use deen_config::search::SearchConfig;
use deen_core::cache::CachedResult;
use deen_core::{ResultCache, clean_search_term};
use deen_types::{
    DictStats, MainMessage, MainState, UiCommand, UiEvent, UpdateStatus, WorkerMessage, WorkerState,
};
use kanal::{AsyncReceiver, AsyncSender};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::navigation::Navigator;
use crate::state::env_id;

/// The request the controller is waiting on while `Searching`
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Search(String),
    Random,
}

/// Controller side of the worker protocol.
///
/// Owns the main state machine, the result cache and the navigation
/// history. Worker replies are applied only in the state that expects them.
pub struct MainContext {
    state: MainState,
    search: SearchConfig,
    protocol: ProtocolConfig,
    results: ResultCache,
    navigator: Navigator,
    pending: Option<Pending>,
    deadline: Option<Instant>,
    status_attempts: u32,
    stats: DictStats,
    updating: Option<UpdateStatus>,
    quit_requested: bool,
    to_worker: AsyncSender<MainMessage>,
    to_ui: AsyncSender<UiEvent>,
}

impl MainContext {
    pub fn new(
        config: &Config,
        to_worker: AsyncSender<MainMessage>,
        to_ui: AsyncSender<UiEvent>,
    ) -> Self {
        Self {
            state: MainState::Init,
            search: config.search.clone(),
            protocol: config.protocol.clone(),
            results: ResultCache::new(config.cache_capacity),
            navigator: Navigator::new(),
            pending: None,
            deadline: None,
            status_attempts: 0,
            stats: DictStats::default(),
            updating: None,
            quit_requested: false,
            to_worker,
            to_ui,
        }
    }

    pub fn state(&self) -> MainState {
        self.state
    }

    /// Drive the state machine until quit, cancellation or a closed channel
    pub async fn run(
        mut self,
        from_worker: AsyncReceiver<WorkerMessage>,
        from_ui: AsyncReceiver<UiCommand>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        self.emit(UiEvent::State(MainState::Init)).await?;
        self.request_status().await?;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = wait_until(self.deadline) => self.on_deadline().await?,
                msg = from_worker.recv() => match msg {
                    Ok(msg) => self.on_worker_message(msg).await?,
                    Err(_) => {
                        if self.state != MainState::Error {
                            self.fail("Worker channel closed").await?;
                        }
                        break;
                    }
                },
                cmd = from_ui.recv() => match cmd {
                    Ok(cmd) => self.on_command(cmd).await?,
                    Err(_) => break,
                },
            }

            if self.quit_requested && matches!(self.state, MainState::Ready | MainState::Error) {
                break;
            }
        }

        tracing::info!("Controller stopping in state {:?}", self.state);
        let _ = self.to_ui.send(UiEvent::Shutdown).await;
        Ok(())
    }

    async fn on_command(&mut self, cmd: UiCommand) -> anyhow::Result<()> {
        tracing::debug!("Command {:?} in state {:?}", cmd, self.state);
        match cmd {
            // a refused search must not move the location
            UiCommand::Search(_) | UiCommand::Back | UiCommand::Forward
                if self.state == MainState::Searching =>
            {
                tracing::warn!("Navigation ignored, another request is in progress");
                Ok(())
            }
            UiCommand::Search(what) => {
                let term = clean_search_term(&what);
                self.navigator.navigate(&term);
                self.request_search(&term).await
            }
            UiCommand::Back => match self.navigator.back().map(str::to_string) {
                Some(term) => self.request_search(&term).await,
                None => Ok(()),
            },
            UiCommand::Forward => match self.navigator.forward().map(str::to_string) {
                Some(term) => self.request_search(&term).await,
                None => Ok(()),
            },
            UiCommand::Random => self.request_random().await,
            UiCommand::Status => {
                self.to_worker.send(MainMessage::StatusRequest).await?;
                Ok(())
            }
            UiCommand::Quit => {
                // finish an outstanding request first
                self.quit_requested = true;
                Ok(())
            }
        }
    }

    /// Search for a term, answering from the result cache when possible.
    /// Only acts when `Ready`; otherwise the request is logged and dropped.
    pub async fn request_search(&mut self, what: &str) -> anyhow::Result<()> {
        let term = clean_search_term(what);
        match self.state {
            MainState::Ready => {}
            MainState::Searching => {
                tracing::warn!("Search for {term:?} ignored, another request is in progress");
                return Ok(());
            }
            state => {
                tracing::debug!("Search for {term:?} not possible in state {state:?}");
                return Ok(());
            }
        }

        if term.is_empty() {
            return self
                .emit(UiEvent::ShowResults {
                    query: term,
                    pattern: String::new(),
                    matches: Vec::new(),
                    cached: false,
                })
                .await;
        }

        if term.chars().count() < self.search.min_term_chars {
            let reason = format!(
                "Search term must be at least {} characters long",
                self.search.min_term_chars
            );
            return self.emit(UiEvent::Rejected { term, reason }).await;
        }

        if let Some(hit) = self.results.get(&term).cloned() {
            tracing::debug!("Result cache hit for {term:?}");
            return self
                .emit(UiEvent::ShowResults {
                    query: term,
                    pattern: hit.pattern,
                    matches: hit.matches,
                    cached: true,
                })
                .await;
        }

        self.to_worker
            .send(MainMessage::Search { what: term.clone() })
            .await?;
        self.pending = Some(Pending::Search(term));
        self.enter_searching().await
    }

    pub async fn request_random(&mut self) -> anyhow::Result<()> {
        if self.state != MainState::Ready {
            tracing::warn!("Random entry not possible in state {:?}", self.state);
            return Ok(());
        }
        self.to_worker.send(MainMessage::GetRandom).await?;
        self.pending = Some(Pending::Random);
        self.enter_searching().await
    }

    async fn on_worker_message(&mut self, msg: WorkerMessage) -> anyhow::Result<()> {
        match msg {
            WorkerMessage::WorkerStatus {
                state,
                stats,
                error,
            } => self.on_status(state, stats, error).await,
            WorkerMessage::DictProgress { percent } => {
                if matches!(self.state, MainState::Init | MainState::AwaitingDict) {
                    self.emit(UiEvent::DictProgress(percent)).await
                } else {
                    tracing::debug!("Dropping load progress in state {:?}", self.state);
                    Ok(())
                }
            }
            WorkerMessage::DictUpdate { status, stats } => {
                tracing::info!("Dictionary update {:?}", status);
                self.stats = stats;
                self.updating = Some(status);
                self.emit_stats().await
            }
            WorkerMessage::SearchProgress { percent } => {
                if self.state == MainState::Searching {
                    self.emit(UiEvent::SearchProgress(percent)).await
                } else {
                    tracing::debug!("Dropping search progress in state {:?}", self.state);
                    Ok(())
                }
            }
            WorkerMessage::Results {
                query,
                pattern,
                matches,
            } => {
                let expected = matches!(&self.pending, Some(Pending::Search(term)) if *term == query);
                if self.state != MainState::Searching || !expected {
                    tracing::warn!(
                        "Dropping results for {query:?} in state {:?} (pending {:?})",
                        self.state,
                        self.pending
                    );
                    return Ok(());
                }

                self.results.set(
                    query.clone(),
                    CachedResult {
                        pattern: pattern.clone(),
                        matches: matches.clone(),
                    },
                );
                self.emit(UiEvent::ShowResults {
                    query,
                    pattern,
                    matches,
                    cached: false,
                })
                .await?;
                self.finish_request().await
            }
            WorkerMessage::RandomLine { line } => {
                if self.state != MainState::Searching || self.pending != Some(Pending::Random) {
                    tracing::warn!("Dropping random line in state {:?}", self.state);
                    return Ok(());
                }
                self.emit(UiEvent::ShowRandom(line)).await?;
                self.finish_request().await
            }
        }
    }

    async fn on_status(
        &mut self,
        state: WorkerState,
        stats: DictStats,
        error: Option<String>,
    ) -> anyhow::Result<()> {
        if self.state == MainState::Error {
            tracing::debug!("Ignoring worker status {:?} after failure", state);
            return Ok(());
        }

        self.stats = stats;
        self.emit_stats().await?;

        match (self.state, state) {
            (MainState::Init, WorkerState::LoadingDict) => {
                self.deadline = None;
                self.set_state(MainState::AwaitingDict).await
            }
            (MainState::Init | MainState::AwaitingDict, WorkerState::Ready) => {
                self.deadline = None;
                self.set_state(MainState::Ready).await?;
                match self.navigator.current().map(str::to_string) {
                    Some(term) => self.request_search(&term).await,
                    None => Ok(()),
                }
            }
            (MainState::Init | MainState::AwaitingDict, WorkerState::Error) => {
                let reason = error.unwrap_or_else(|| "Failed to load the dictionary".to_string());
                self.fail(&reason).await
            }
            (current, reported) => {
                tracing::debug!("Worker status {:?} while {:?}", reported, current);
                Ok(())
            }
        }
    }

    async fn on_deadline(&mut self) -> anyhow::Result<()> {
        self.deadline = None;
        match self.state {
            MainState::Init if self.status_attempts < self.protocol.status_retries => {
                self.request_status().await
            }
            MainState::Init => {
                let reason = format!(
                    "Worker did not answer {} status requests",
                    self.status_attempts
                );
                self.fail(&reason).await
            }
            MainState::Searching => {
                let reason = match &self.pending {
                    Some(Pending::Search(term)) => format!("Search for {term:?} timed out"),
                    _ => "Request for a random entry timed out".to_string(),
                };
                self.fail(&reason).await
            }
            _ => Ok(()),
        }
    }

    async fn request_status(&mut self) -> anyhow::Result<()> {
        self.status_attempts += 1;
        tracing::debug!("Status request {}", self.status_attempts);
        self.to_worker.send(MainMessage::StatusRequest).await?;
        self.deadline = Some(Instant::now() + Duration::from_millis(self.protocol.status_backoff_ms));
        Ok(())
    }

    async fn enter_searching(&mut self) -> anyhow::Result<()> {
        self.deadline =
            Some(Instant::now() + Duration::from_millis(self.protocol.search_timeout_ms));
        self.set_state(MainState::Searching).await
    }

    async fn finish_request(&mut self) -> anyhow::Result<()> {
        self.pending = None;
        self.deadline = None;
        self.set_state(MainState::Ready).await
    }

    /// Enter the terminal error state
    async fn fail(&mut self, reason: &str) -> anyhow::Result<()> {
        let message = format!("{}: {}", env_id(), reason);
        tracing::error!("{message}");
        self.pending = None;
        self.deadline = None;
        self.set_state(MainState::Error).await?;
        self.emit(UiEvent::Fatal(message)).await
    }

    async fn set_state(&mut self, state: MainState) -> anyhow::Result<()> {
        if self.state == state {
            return Ok(());
        }
        tracing::debug!("State {:?} -> {:?}", self.state, state);
        self.state = state;
        self.emit(UiEvent::State(state)).await
    }

    async fn emit_stats(&self) -> anyhow::Result<()> {
        self.emit(UiEvent::Stats {
            stats: self.stats,
            updating: self.updating,
        })
        .await
    }

    async fn emit(&self, event: UiEvent) -> anyhow::Result<()> {
        self.to_ui.send(event).await?;
        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Controller task: runs a [`MainContext`] over the given channels
pub async fn event_loop(
    config: Config,
    to_worker: AsyncSender<MainMessage>,
    from_worker: AsyncReceiver<WorkerMessage>,
    to_ui: AsyncSender<UiEvent>,
    from_ui: AsyncReceiver<UiCommand>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    MainContext::new(&config, to_worker, to_ui)
        .run(from_worker, from_ui, cancel)
        .await
}
