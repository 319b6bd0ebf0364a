//! Worker loop against an in-memory source and cache

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use deen_dict::pipeline::open_dictionary_cache;
use deen_dict::{Cache, CacheStorage, MemoryCacheStorage};
use deen_types::{DictStats, MainMessage, UpdateStatus, WorkerMessage, WorkerState};
use kanal::{AsyncReceiver, AsyncSender, unbounded_async};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::state::AppState;
use crate::worker::worker_loop;

struct Worker {
    inbox: AsyncSender<MainMessage>,
    outbox: AsyncReceiver<WorkerMessage>,
    cancel: CancellationToken,
    task: JoinHandle<anyhow::Result<()>>,
}

fn start(source: Arc<FakeSource>) -> Worker {
    start_with_storage(source, Arc::new(MemoryCacheStorage::new()))
}

fn start_with_storage(source: Arc<FakeSource>, storage: Arc<dyn CacheStorage>) -> Worker {
    let (inbox, worker_inbox) = unbounded_async();
    let (worker_outbox, outbox) = unbounded_async();
    let cancel = CancellationToken::new();

    let task = tokio::spawn(worker_loop(
        Arc::new(AppState::new(test_config())),
        source,
        storage,
        worker_inbox,
        worker_outbox,
        cancel.clone(),
    ));

    Worker {
        inbox,
        outbox,
        cancel,
        task,
    }
}

fn is_status(msg: &WorkerMessage) -> bool {
    matches!(msg, WorkerMessage::WorkerStatus { .. })
}

#[tokio::test]
async fn test_load_reports_progress_then_ready() {
    let worker = start(Arc::new(FakeSource::serving_dict()));

    let mut progress = Vec::new();
    let status = loop {
        match next(&worker.outbox).await {
            WorkerMessage::DictProgress { percent } => progress.push(percent),
            msg if is_status(&msg) => break msg,
            other => panic!("unexpected {other:?}"),
        }
    };

    let WorkerMessage::WorkerStatus {
        state,
        stats,
        error,
    } = status
    else {
        unreachable!()
    };
    assert_eq!(state, WorkerState::Ready);
    assert_eq!(stats.lines, 4);
    assert_eq!(stats.entries, 5);
    assert_eq!(error, None);
    assert_eq!(progress.first(), Some(&0.0));
    assert_eq!(progress.last(), Some(&100.0));
}

#[tokio::test]
async fn test_search_and_random_after_load() {
    let worker = start(Arc::new(FakeSource::serving_dict()));
    next_matching(&worker.outbox, is_status).await;

    worker
        .inbox
        .send(MainMessage::Search {
            what: "laufen".into(),
        })
        .await
        .unwrap();
    let msg = next_matching(&worker.outbox, |m| {
        matches!(m, WorkerMessage::Results { .. })
    })
    .await;
    let WorkerMessage::Results {
        query,
        pattern,
        matches,
    } = msg
    else {
        unreachable!()
    };
    assert_eq!(query, "laufen");
    assert!(!pattern.is_empty());
    assert_eq!(matches, vec!["laufen {vi} :: to run".to_string()]);

    worker.inbox.send(MainMessage::GetRandom).await.unwrap();
    let msg = next_matching(&worker.outbox, |m| {
        matches!(m, WorkerMessage::RandomLine { .. })
    })
    .await;
    let WorkerMessage::RandomLine { line } = msg else {
        unreachable!()
    };
    assert!(dict_lines().contains(&line.as_str()), "{line:?}");

    worker.inbox.send(MainMessage::StatusRequest).await.unwrap();
    let msg = next_matching(&worker.outbox, is_status).await;
    assert!(matches!(
        msg,
        WorkerMessage::WorkerStatus {
            state: WorkerState::Ready,
            ..
        }
    ));
}

#[tokio::test]
async fn test_requests_while_loading() {
    let source = Arc::new(FakeSource::serving_dict());
    source.hold(DICT_URL);
    let worker = start(source.clone());

    worker.inbox.send(MainMessage::StatusRequest).await.unwrap();
    let msg = next_matching(&worker.outbox, is_status).await;
    assert!(matches!(
        msg,
        WorkerMessage::WorkerStatus {
            state: WorkerState::LoadingDict,
            ..
        }
    ));

    // no dictionary yet: an empty answer, never silence
    worker
        .inbox
        .send(MainMessage::Search { what: "Hund".into() })
        .await
        .unwrap();
    let msg = next_matching(&worker.outbox, |m| {
        matches!(m, WorkerMessage::Results { .. })
    })
    .await;
    assert_eq!(
        msg,
        WorkerMessage::Results {
            query: "Hund".into(),
            pattern: String::new(),
            matches: Vec::new(),
        }
    );

    source.open();
    let msg = next_matching(&worker.outbox, is_status).await;
    assert!(matches!(
        msg,
        WorkerMessage::WorkerStatus {
            state: WorkerState::Ready,
            ..
        }
    ));
}

#[tokio::test]
async fn test_load_failure_reported() {
    let worker = start(Arc::new(FakeSource::default()));

    let msg = next_matching(&worker.outbox, is_status).await;
    let WorkerMessage::WorkerStatus { state, error, .. } = msg else {
        unreachable!()
    };
    assert_eq!(state, WorkerState::Error);
    assert!(error.unwrap().contains("404"));

    worker.inbox.send(MainMessage::GetRandom).await.unwrap();
    let msg = next(&worker.outbox).await;
    assert_eq!(msg, WorkerMessage::RandomLine { line: String::new() });
}

#[tokio::test]
async fn test_worker_stops_on_cancel() {
    let worker = start(Arc::new(FakeSource::serving_dict()));
    next_matching(&worker.outbox, is_status).await;

    worker.cancel.cancel();
    let result = timeout(Duration::from_secs(2), worker.task)
        .await
        .expect("worker did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_worker_stops_when_controller_gone() {
    let worker = start(Arc::new(FakeSource::serving_dict()));
    drop(worker.inbox);

    let result = timeout(Duration::from_secs(2), worker.task)
        .await
        .expect("worker did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_status_reports_stats_after_update() {
    let config = test_config();
    let storage = Arc::new(MemoryCacheStorage::new());
    let cache = open_dictionary_cache(storage.as_ref(), &config.dictionary)
        .await
        .unwrap();
    cache
        .put(DICT_URL, gzip("# old\nHund :: dog\nKatze :: cat\n"))
        .await
        .unwrap();
    cache
        .put(VERSION_URL, Bytes::from_static(b"v1"))
        .await
        .unwrap();

    let source = FakeSource::serving_dict();
    source.serve(VERSION_URL, Bytes::from_static(b"v2"));
    let worker = start_with_storage(Arc::new(source), storage);

    let fresh = DictStats {
        lines: 4,
        entries: 5,
        one_to_one: None,
    };
    let (mut loaded, mut updated) = (false, false);
    while !(loaded && updated) {
        match next(&worker.outbox).await {
            WorkerMessage::WorkerStatus { state, stats, .. } => {
                assert_eq!(state, WorkerState::Ready);
                assert_eq!(stats.lines, 2);
                loaded = true;
            }
            WorkerMessage::DictUpdate {
                status: UpdateStatus::Done,
                stats,
            } => {
                assert_eq!(stats, fresh);
                updated = true;
            }
            _ => {}
        }
    }

    worker.inbox.send(MainMessage::StatusRequest).await.unwrap();
    let msg = next_matching(&worker.outbox, is_status).await;
    assert_eq!(
        msg,
        WorkerMessage::WorkerStatus {
            state: WorkerState::Ready,
            stats: fresh,
            error: None,
        }
    );
}
