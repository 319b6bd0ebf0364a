use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use deen_config::dictionary::DictionaryConfig;
use deen_core::{DictHandle, Dictionary};
use deen_types::{DictStats, UpdateStatus};
use tokio::task::JoinHandle;

use crate::error::{LoadError, StoreError};
use crate::fetch::{RemoteSource, Response};
use crate::gunzip::{ProgressFn, gunzip_utf8};
use crate::parse::parse_dictionary;
use crate::store::{Cache, CacheStorage, prune_partitions};
use crate::version::needs_update;

/// What the loader reports while it works
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    /// Download or cache-read progress of the initial load
    Progress(f64),
    /// A background refresh changed state
    Update {
        status: UpdateStatus,
        stats: DictStats,
    },
}

pub type LoadCallback = Arc<dyn Fn(LoadEvent) + Send + Sync>;

/// How the background task after a load ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The dictionary was freshly downloaded, only the version was recorded
    VersionRecorded,
    UpToDate,
    Updated(DictStats),
    Failed,
}

pub struct Loaded {
    pub stats: DictStats,
    /// Background version check, may be dropped to let it run detached
    pub refresh: JoinHandle<RefreshOutcome>,
}

/// Open the dictionary partition, deleting partitions of other builds
pub async fn open_dictionary_cache(
    storage: &dyn CacheStorage,
    config: &DictionaryConfig,
) -> Result<Arc<dyn Cache>, StoreError> {
    let app_cache = config.app_cache_name();
    prune_partitions(storage, &[config.cache_name.as_str(), app_cache.as_str()]).await?;
    storage.open(&app_cache).await?;
    storage.open(&config.cache_name).await
}

/// Loads the dictionary into a [`DictHandle`], cache first, refreshing in
/// the background when the remote copy changed.
#[derive(Clone)]
pub struct DictLoader {
    source: Arc<dyn RemoteSource>,
    cache: Arc<dyn Cache>,
    handle: DictHandle,
    events: LoadCallback,
    config: DictionaryConfig,
}

impl DictLoader {
    pub fn new(
        config: &DictionaryConfig,
        source: Arc<dyn RemoteSource>,
        cache: Arc<dyn Cache>,
        handle: DictHandle,
        events: LoadCallback,
    ) -> Self {
        Self {
            source,
            cache,
            handle,
            events,
            config: config.clone(),
        }
    }

    pub fn handle(&self) -> &DictHandle {
        &self.handle
    }

    pub async fn load(&self) -> Result<Loaded, LoadError> {
        let events = self.events.clone();
        let report = move |p: f64| events(LoadEvent::Progress(p));

        if let Some(dictionary) = self.load_cached(&report).await {
            tracing::info!("Using cached dictionary, checking for an update in the background");
            let stats = dictionary.stats;
            self.handle.replace(dictionary);
            let this = self.clone();
            let refresh = tokio::spawn(async move { this.refresh().await });
            return Ok(Loaded { stats, refresh });
        }

        tracing::info!("Dictionary not cached, fetching {}", self.config.dict_url);
        let (dictionary, raw) = self.fetch_fresh(Some(&report)).await?;
        let stats = dictionary.stats;
        self.handle.replace(dictionary);
        self.store(raw).await;

        let this = self.clone();
        let refresh = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(this.config.update_check_delay_ms)).await;
            needs_update(
                this.source.as_ref(),
                this.cache.as_ref(),
                &this.config.version_url,
            )
            .await;
            RefreshOutcome::VersionRecorded
        });
        Ok(Loaded { stats, refresh })
    }

    /// The cached copy, if there is one that still parses
    async fn load_cached(&self, report: ProgressFn<'_>) -> Option<Dictionary> {
        let body = match self.cache.get(&self.config.dict_url).await {
            Ok(body) => body?,
            Err(e) => {
                tracing::warn!("Could not read cached dictionary: {e}");
                return None;
            }
        };

        match self.decode(Response::from_bytes(body), Some(report)).await {
            Ok((dictionary, _)) => Some(dictionary),
            Err(e) => {
                tracing::warn!("Discarding unusable cached dictionary: {e}");
                if let Err(e) = self.cache.delete(&self.config.dict_url).await {
                    tracing::warn!("Could not delete cached dictionary: {e}");
                }
                None
            }
        }
    }

    async fn fetch_fresh(
        &self,
        report: Option<ProgressFn<'_>>,
    ) -> Result<(Dictionary, Bytes), LoadError> {
        let response = self.source.fetch(&self.config.dict_url).await?;
        self.decode(response, report).await
    }

    async fn decode(
        &self,
        response: Response,
        report: Option<ProgressFn<'_>>,
    ) -> Result<(Dictionary, Bytes), LoadError> {
        let decoded = gunzip_utf8(response, report).await?;
        let dictionary = parse_dictionary(&decoded.text, self.config.stats_scan_lines)?;
        Ok((dictionary, decoded.raw))
    }

    async fn store(&self, raw: Bytes) {
        if let Err(e) = self.cache.put(&self.config.dict_url, raw).await {
            tracing::warn!("Could not cache dictionary: {e}");
        }
    }

    async fn refresh(&self) -> RefreshOutcome {
        tokio::time::sleep(Duration::from_millis(self.config.update_check_delay_ms)).await;

        let update = needs_update(
            self.source.as_ref(),
            self.cache.as_ref(),
            &self.config.version_url,
        )
        .await;
        if !update {
            return RefreshOutcome::UpToDate;
        }

        tracing::info!("Fetching updated dictionary");
        self.emit_update(UpdateStatus::Loading, self.handle.stats());

        match self.fetch_fresh(None).await {
            Ok((dictionary, raw)) => {
                let stats = dictionary.stats;
                self.handle.replace(dictionary);
                self.store(raw).await;
                tracing::info!("Dictionary updated to {} lines", stats.lines);
                self.emit_update(UpdateStatus::Done, stats);
                RefreshOutcome::Updated(stats)
            }
            Err(e) => {
                tracing::error!("Dictionary update failed: {e}");
                // forget the new marker so the next start tries again
                if let Err(e) = self.cache.delete(&self.config.version_url).await {
                    tracing::warn!("Could not reset cached dictionary version: {e}");
                }
                self.emit_update(UpdateStatus::Error, self.handle.stats());
                RefreshOutcome::Failed
            }
        }
    }

    fn emit_update(&self, status: UpdateStatus, stats: DictStats) {
        (self.events)(LoadEvent::Update { status, stats });
    }
}
