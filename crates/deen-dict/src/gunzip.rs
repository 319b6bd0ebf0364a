use std::io::Write;
use std::time::Duration;

use bytes::Bytes;
use deen_core::progress::{ProgressThrottle, percent};
use flate2::write::GzDecoder;
use futures_util::StreamExt;

use crate::error::LoadError;
use crate::fetch::Response;

const INITIAL_REPORT: Duration = Duration::from_millis(500);
const REPORT_INTERVAL: Duration = Duration::from_millis(100);

pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// A decompressed body together with the compressed bytes it came from
pub struct Decoded {
    pub text: String,
    pub raw: Bytes,
}

/// Decompress a gzip body into UTF-8 text as the chunks arrive.
///
/// With a progress callback and a known content length, reports start at 0%
/// and end at 100%, with throttled reports of the compressed bytes seen in
/// between.
pub async fn gunzip_utf8(
    response: Response,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<Decoded, LoadError> {
    let Response {
        content_length,
        mut body,
    } = response;
    let progress = on_progress.zip(content_length);

    let mut decoder = GzDecoder::new(Vec::new());
    let mut raw = Vec::with_capacity(content_length.unwrap_or(0) as usize);
    let mut throttle = ProgressThrottle::new(INITIAL_REPORT, REPORT_INTERVAL);

    if let Some((report, _)) = progress {
        report(0.0);
    }

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        decoder.write_all(&chunk).map_err(LoadError::Decompress)?;
        raw.extend_from_slice(&chunk);

        if let Some((report, total)) = progress {
            let done = percent(raw.len() as u64, total).min(100.0);
            if let Some(p) = throttle.poll(done) {
                report(p);
            }
        }
    }

    let text = decoder.finish().map_err(LoadError::Decompress)?;

    if let Some((report, total)) = progress {
        report(100.0);
        if raw.len() as u64 != total {
            tracing::warn!(
                "Expected {} bytes but received {}, progress was inaccurate",
                total,
                raw.len()
            );
        }
    }

    let text = String::from_utf8(text)?;
    tracing::debug!(
        "Decompressed {} bytes into {} bytes of text",
        raw.len(),
        text.len()
    );
    Ok(Decoded {
        text,
        raw: Bytes::from(raw),
    })
}
