pub mod error;
pub mod fetch;
pub mod gunzip;
pub mod parse;
pub mod pipeline;
pub mod store;
pub mod version;

#[cfg(test)]
mod testutil;

pub use error::{FetchError, LoadError, StoreError};
pub use fetch::{HttpSource, RemoteSource, Response};
pub use pipeline::{DictLoader, LoadCallback, LoadEvent, Loaded, RefreshOutcome};
pub use store::{Cache, CacheStorage, FsCacheStorage, MemoryCacheStorage};
