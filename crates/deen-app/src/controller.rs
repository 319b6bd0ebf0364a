use std::sync::Arc;

use deen_dict::{CacheStorage, RemoteSource};
use deen_types::{MainMessage, UiCommand, UiEvent, WorkerMessage};
use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::events::event_loop;
use crate::state::AppState;
use crate::ui::{UiOptions, ui_loop};
use crate::worker::worker_loop;

/// Centralized channel management
pub struct ChannelSet {
    pub main_to_worker: (AsyncSender<MainMessage>, AsyncReceiver<MainMessage>),
    // unbounded: progress is pushed with try_send and must not be lost
    pub worker_to_main: (AsyncSender<WorkerMessage>, AsyncReceiver<WorkerMessage>),
    pub app_to_ui: (AsyncSender<UiEvent>, AsyncReceiver<UiEvent>),
    pub ui_to_app: (AsyncSender<UiCommand>, AsyncReceiver<UiCommand>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            main_to_worker: kanal::bounded_async(64),
            worker_to_main: kanal::unbounded_async(),
            app_to_ui: kanal::bounded_async(256),
            ui_to_app: kanal::bounded_async(64),
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            channels: ChannelSet::new(),
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Sender for front-end commands
    pub fn commands(&self) -> AsyncSender<UiCommand> {
        self.channels.ui_to_app.0.clone()
    }

    pub async fn spawn_tasks(
        &self,
        source: Arc<dyn RemoteSource>,
        storage: Arc<dyn CacheStorage>,
        ui: UiOptions,
    ) -> (JoinSet<anyhow::Result<()>>, JoinHandle<anyhow::Result<()>>) {
        let mut tasks = JoinSet::new();
        let config = self.state.config.read().await.clone();

        // Worker
        tasks.spawn(worker_loop(
            self.state.clone(),
            source,
            storage,
            self.channels.main_to_worker.1.clone(),
            self.channels.worker_to_main.0.clone(),
            self.cancel_token.child_token(),
        ));

        // Controller
        tasks.spawn(event_loop(
            config,
            self.channels.main_to_worker.0.clone(),
            self.channels.worker_to_main.1.clone(),
            self.channels.app_to_ui.0.clone(),
            self.channels.ui_to_app.1.clone(),
            self.cancel_token.child_token(),
        ));

        // Front end, joined separately so its output is complete before exit
        let ui_task = tokio::spawn(ui_loop(
            self.channels.app_to_ui.1.clone(),
            self.channels.ui_to_app.0.clone(),
            ui,
        ));

        (tasks, ui_task)
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
