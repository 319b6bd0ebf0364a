use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};

use crate::error::FetchError;

/// Size of the slices a buffered body is replayed in, so progress can be reported
const REPLAY_CHUNK: usize = 64 * 1024;

pub type BodyStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// A response body that arrives in chunks
pub struct Response {
    /// Declared size of the body, if the source knows it
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

impl Response {
    /// Replay an in-memory body, e.g. one read from the cache
    pub fn from_bytes(body: Bytes) -> Self {
        let len = body.len();
        let chunks: Vec<Result<Bytes, FetchError>> = (0..len)
            .step_by(REPLAY_CHUNK)
            .map(|start| Ok(body.slice(start..len.min(start + REPLAY_CHUNK))))
            .collect();
        Self {
            content_length: Some(len as u64),
            body: stream::iter(chunks).boxed(),
        }
    }

    /// Read the whole body
    pub async fn collect(mut self) -> Result<Bytes, FetchError> {
        let mut buf = Vec::with_capacity(self.content_length.unwrap_or(0) as usize);
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

/// Where the dictionary and its version marker come from
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// Start fetching a resource, bypassing any cache
    async fn fetch(&self, url: &str) -> Result<Response, FetchError>;
}

/// Fetches over HTTP(S)
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl RemoteSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        tracing::debug!("{} {}", url, status);

        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(FetchError::from))
            .boxed();
        Ok(Response {
            content_length,
            body,
        })
    }
}
