use std::sync::Arc;

use deen_config::dictionary::DictionaryConfig;
use deen_core::search::search_dict;
use deen_core::{DictHandle, Dictionary, SearchOptions};
use deen_dict::pipeline::open_dictionary_cache;
use deen_dict::store::MemoryCache;
use deen_dict::{Cache, CacheStorage, DictLoader, LoadCallback, LoadEvent, RemoteSource};
use deen_types::{MainMessage, WorkerMessage, WorkerState};
use kanal::{AsyncReceiver, AsyncSender};
use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;
use crate::status::StatusReport;

/// The worker context: owns the dictionary, answers the controller.
///
/// Loading starts immediately in the background; status requests are
/// answered at any time with whatever is known so far.
pub async fn worker_loop(
    state: Arc<AppState>,
    source: Arc<dyn RemoteSource>,
    storage: Arc<dyn CacheStorage>,
    inbox: AsyncReceiver<MainMessage>,
    outbox: AsyncSender<WorkerMessage>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let config = state.config.read().await.clone();
    let options = SearchOptions::from(&config.search);
    let handle = DictHandle::new();
    let status = Arc::new(RwLock::new(StatusReport::default()));

    tokio::spawn(load_dictionary(
        config.dictionary.clone(),
        source,
        storage,
        handle.clone(),
        status.clone(),
        outbox.clone(),
    ));

    tracing::info!("Worker started");
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Worker stopping");
                return Ok(());
            }
            msg = inbox.recv() => match msg {
                Ok(msg) => msg,
                Err(_) => {
                    tracing::info!("Controller went away, worker stopping");
                    return Ok(());
                }
            },
        };

        tracing::debug!("Worker received {:?}", msg);
        match msg {
            MainMessage::StatusRequest => {
                let mut report = status.read().await.clone();
                if report.state == WorkerState::Ready {
                    // a background update may have swapped the dictionary
                    report.stats = handle.stats();
                }
                outbox.send(report.to_message()).await?;
            }
            MainMessage::Search { what } => {
                let state = status.read().await.state;
                if state != WorkerState::Ready {
                    tracing::warn!("Search for {what:?} while {state:?}, answering with no results");
                    outbox
                        .send(WorkerMessage::Results {
                            query: what,
                            pattern: String::new(),
                            matches: Vec::new(),
                        })
                        .await?;
                    continue;
                }
                spawn_search(handle.snapshot(), what, options.clone(), outbox.clone());
            }
            MainMessage::GetRandom => {
                let line = random_line(&handle.snapshot());
                outbox.send(WorkerMessage::RandomLine { line }).await?;
            }
        }
    }
}

async fn load_dictionary(
    config: DictionaryConfig,
    source: Arc<dyn RemoteSource>,
    storage: Arc<dyn CacheStorage>,
    handle: DictHandle,
    status: Arc<RwLock<StatusReport>>,
    outbox: AsyncSender<WorkerMessage>,
) {
    let cache: Arc<dyn Cache> = match open_dictionary_cache(storage.as_ref(), &config).await {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!("Dictionary cache unavailable, continuing without it: {e}");
            Arc::new(MemoryCache::default())
        }
    };

    let events: LoadCallback = {
        let outbox = outbox.clone();
        Arc::new(move |event: LoadEvent| {
            let msg = match event {
                LoadEvent::Progress(percent) => WorkerMessage::DictProgress { percent },
                LoadEvent::Update { status, stats } => WorkerMessage::DictUpdate { status, stats },
            };
            if let Err(e) = outbox.try_send(msg) {
                tracing::warn!("Failed to push load event: {e}");
            }
        })
    };

    let loader = DictLoader::new(&config, source, cache, handle, events);
    let report = match loader.load().await {
        Ok(loaded) => {
            tracing::info!(
                "Loaded {} dictionary lines ({} entries)",
                loaded.stats.lines,
                loaded.stats.entries
            );
            // the refresh keeps running detached
            drop(loaded.refresh);
            StatusReport::ready(loaded.stats)
        }
        Err(e) => {
            tracing::error!("Failed to load dictionary: {e}");
            StatusReport::failed(e.to_string())
        }
    };

    let msg = report.to_message();
    *status.write().await = report;
    if let Err(e) = outbox.send(msg).await {
        tracing::warn!("Failed to send worker status: {e}");
    }
}

/// Run a search on a blocking thread over a snapshot of the dictionary
fn spawn_search(
    dict: Arc<Dictionary>,
    what: String,
    options: SearchOptions,
    outbox: AsyncSender<WorkerMessage>,
) {
    tokio::spawn(async move {
        let progress = outbox.clone();
        let query = what.clone();
        let result = tokio::task::spawn_blocking(move || {
            search_dict(&dict.lines, &query, &options, |percent| {
                if let Err(e) = progress.try_send(WorkerMessage::SearchProgress { percent }) {
                    tracing::warn!("Failed to push search progress: {e}");
                }
            })
        })
        .await;

        let (pattern, matches) = match result {
            Ok(Ok(outcome)) => (outcome.pattern, outcome.matches),
            Ok(Err(e)) => {
                tracing::error!("Search for {what:?} failed: {e}");
                (String::new(), Vec::new())
            }
            Err(e) => {
                tracing::error!("Search task for {what:?} panicked: {e}");
                (String::new(), Vec::new())
            }
        };

        tracing::debug!("Search for {what:?} found {} matches", matches.len());
        let msg = WorkerMessage::Results {
            query: what,
            pattern,
            matches,
        };
        if let Err(e) = outbox.send(msg).await {
            tracing::warn!("Failed to send search results: {e}");
        }
    });
}

/// A uniformly chosen line, empty if nothing is loaded
pub fn random_line(dict: &Dictionary) -> String {
    dict.lines
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default()
}
