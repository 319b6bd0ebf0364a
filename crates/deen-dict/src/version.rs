use crate::fetch::RemoteSource;
use crate::store::Cache;

/// Whether the remote dictionary changed since it was last cached.
///
/// Compares the remote version marker byte for byte with the cached one and
/// records the fresh marker. A marker that cannot be fetched means no update
/// is known.
pub async fn needs_update(source: &dyn RemoteSource, cache: &dyn Cache, version_url: &str) -> bool {
    let fresh = match source.fetch(version_url).await {
        Ok(response) => response.collect().await,
        Err(e) => Err(e),
    };
    let fresh = match fresh {
        Ok(body) => body,
        Err(e) => {
            tracing::info!("Failed to check dictionary version: {e}");
            return false;
        }
    };

    let needed = match cache.get(version_url).await {
        Ok(Some(cached)) if cached == fresh => {
            tracing::debug!("Dictionary version unchanged");
            false
        }
        Ok(Some(_)) => {
            tracing::info!("Dictionary version changed");
            true
        }
        Ok(None) => {
            tracing::debug!("No cached dictionary version");
            true
        }
        Err(e) => {
            tracing::warn!("Could not read cached dictionary version: {e}");
            true
        }
    };

    if let Err(e) = cache.put(version_url, fresh).await {
        tracing::warn!("Could not cache dictionary version: {e}");
    }
    needed
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::store::{CacheStorage, MemoryCacheStorage};
    use crate::testutil::FakeSource;

    const VERSION_URL: &str = "https://example.org/version.txt";

    #[tokio::test]
    async fn test_version_transitions() {
        let source = FakeSource::default();
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("DeEnDict").await.unwrap();

        source.serve(VERSION_URL, Bytes::from_static(b"2024-01-01"));
        assert!(needs_update(&source, cache.as_ref(), VERSION_URL).await);
        assert_eq!(
            cache.get(VERSION_URL).await.unwrap(),
            Some(Bytes::from_static(b"2024-01-01"))
        );

        assert!(!needs_update(&source, cache.as_ref(), VERSION_URL).await);

        source.serve(VERSION_URL, Bytes::from_static(b"2024-02-01"));
        assert!(needs_update(&source, cache.as_ref(), VERSION_URL).await);
        assert!(!needs_update(&source, cache.as_ref(), VERSION_URL).await);
        assert_eq!(source.fetches(VERSION_URL), 4);
    }

    #[tokio::test]
    async fn test_unreachable_marker_means_no_update() {
        let source = FakeSource::default();
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("DeEnDict").await.unwrap();
        cache
            .put(VERSION_URL, Bytes::from_static(b"old"))
            .await
            .unwrap();

        assert!(!needs_update(&source, cache.as_ref(), VERSION_URL).await);
        assert_eq!(
            cache.get(VERSION_URL).await.unwrap(),
            Some(Bytes::from_static(b"old"))
        );
    }
}
