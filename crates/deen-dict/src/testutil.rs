use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::FetchError;
use crate::fetch::{RemoteSource, Response};

pub fn gzip_bytes(data: &[u8]) -> Bytes {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

pub fn gzip(text: &str) -> Bytes {
    gzip_bytes(text.as_bytes())
}

/// Serves fixed bodies by URL and counts every fetch
#[derive(Default)]
pub struct FakeSource {
    bodies: Mutex<HashMap<String, Bytes>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl FakeSource {
    pub fn serve(&self, url: &str, body: Bytes) {
        self.bodies.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn fetches(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl RemoteSource for FakeSource {
    async fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        *self.fetches.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let body = self.bodies.lock().unwrap().get(url).cloned();
        match body {
            Some(body) => Ok(Response::from_bytes(body)),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
