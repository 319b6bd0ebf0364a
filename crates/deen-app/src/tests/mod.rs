mod worker_tests;

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use deen_config::Config;
use deen_dict::{FetchError, RemoteSource, Response};
use flate2::Compression;
use flate2::write::GzEncoder;
use kanal::AsyncReceiver;
use tokio::sync::Notify;
use tokio::time::timeout;

pub const DICT_URL: &str = "https://dict.example/de-en.txt.gz";
pub const VERSION_URL: &str = "https://dict.example/sha256sums.txt";

pub const DICT: &str = "# Version 1.9 :: test build\n\
laufen {vi} :: to run\n\
rennen {vi} :: to run; to race\n\
Hund {m} | Hunde {pl} :: dog | dogs\n\
Katze {f} :: cat\n";

pub fn dict_lines() -> Vec<&'static str> {
    DICT.lines().filter(|l| !l.starts_with('#')).collect()
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.dictionary.dict_url = DICT_URL.to_string();
    config.dictionary.version_url = VERSION_URL.to_string();
    config.dictionary.update_check_delay_ms = 0;
    config
}

pub fn gzip(text: &str) -> Bytes {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

/// Serves fixed bodies by URL. A gated URL is held back until `open` is called.
#[derive(Default)]
pub struct FakeSource {
    bodies: Mutex<HashMap<String, Bytes>>,
    gated: Mutex<Option<String>>,
    gate: Notify,
}

impl FakeSource {
    pub fn serving_dict() -> Self {
        let source = Self::default();
        source.serve(DICT_URL, gzip(DICT));
        source
    }

    pub fn serve(&self, url: &str, body: Bytes) {
        self.bodies.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn hold(&self, url: &str) {
        *self.gated.lock().unwrap() = Some(url.to_string());
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl RemoteSource for FakeSource {
    async fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let held = self.gated.lock().unwrap().as_deref() == Some(url);
        if held {
            self.gate.notified().await;
        }
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

/// Receive the next message, failing the test after two seconds
pub async fn next<T>(rx: &AsyncReceiver<T>) -> T {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("channel closed")
}

/// Skip messages until one matches
pub async fn next_matching<T: std::fmt::Debug>(
    rx: &AsyncReceiver<T>,
    pred: impl Fn(&T) -> bool,
) -> T {
    loop {
        let msg = next(rx).await;
        if pred(&msg) {
            return msg;
        }
        tracing::debug!("Skipping {:?}", msg);
    }
}
