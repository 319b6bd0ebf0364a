//! Worker over stdin/stdout: one JSON message per line in each direction.

use std::sync::Arc;

use deen_dict::{CacheStorage, RemoteSource};
use deen_types::wire::{decode, encode};
use deen_types::{MainMessage, ProtocolError, WorkerMessage};
use kanal::{AsyncReceiver, AsyncSender};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::state::AppState;
use crate::worker::worker_loop;

pub async fn serve_stdio(
    state: Arc<AppState>,
    source: Arc<dyn RemoteSource>,
    storage: Arc<dyn CacheStorage>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let (to_worker, inbox) = kanal::bounded_async(64);
    let (outbox, from_worker) = kanal::unbounded_async();

    let worker = tokio::spawn(worker_loop(
        state,
        source,
        storage,
        inbox,
        outbox,
        cancel.child_token(),
    ));
    let writer = tokio::spawn(write_messages(from_worker, tokio::io::stdout()));

    tokio::select! {
        result = read_messages(tokio::io::stdin(), to_worker) => result?,
        _ = cancel.cancelled() => {}
    }
    tracing::info!("Input closed, waiting for the worker to finish");

    worker.await??;
    writer.await??;
    Ok(())
}

/// Decode controller messages from a line stream. Lines that cannot be
/// decoded are logged and skipped.
pub async fn read_messages<R: AsyncRead + Unpin>(
    reader: R,
    to_worker: AsyncSender<MainMessage>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match decode::<MainMessage>(&line) {
            Ok(msg) => to_worker.send(msg).await?,
            Err(ProtocolError::UnknownTag(tag)) => {
                tracing::warn!("Ignoring message of unknown type {tag:?}")
            }
            Err(e) => tracing::warn!("Ignoring undecodable message: {e}"),
        }
    }
    Ok(())
}

/// Encode worker messages one per line until every sender is gone
pub async fn write_messages<W: AsyncWrite + Unpin>(
    from_worker: AsyncReceiver<WorkerMessage>,
    mut writer: W,
) -> anyhow::Result<()> {
    while let Ok(msg) = from_worker.recv().await {
        let mut line = encode(&msg)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
