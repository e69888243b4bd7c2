//! Active-key observer over a query cache

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::{CacheEntry, CacheKey, CacheStatus, QueryCache, QueryOptions};
use crate::config::CacheConfig;
use crate::DataError;

struct ObserverState<T> {
    key: CacheKey,
    enabled: bool,
    /// Last data served for any key, shown while a new key loads
    last_data: Option<Arc<T>>,
    /// The key changed since the last read; a failed entry gets one new attempt
    key_changed: bool,
}

/// Follows one active key at a time, the way a rendered view reads a query.
///
/// When the key changes the previous key's data keeps being served, marked
/// as placeholder, until the new key resolves (if configured).
pub struct QueryObserver<T> {
    cache: QueryCache<T>,
    config: CacheConfig,
    state: Mutex<ObserverState<T>>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    /// Create a new observer starting at `key`. `config.enabled` is the
    /// initial gate.
    pub fn new(cache: QueryCache<T>, key: CacheKey, config: CacheConfig) -> Self {
        Self {
            cache,
            state: Mutex::new(ObserverState {
                key,
                enabled: config.enabled,
                last_data: None,
                key_changed: false,
            }),
            config,
        }
    }

    pub fn key(&self) -> CacheKey {
        self.state.lock().key.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Switch the active key
    pub fn set_key(&self, key: CacheKey) {
        let mut state = self.state.lock();
        if state.key == key {
            return;
        }

        if let Some(data) = self.cache.peek(&state.key).data {
            state.last_data = Some(data);
        }
        debug!(from = %state.key, to = %key, "Active key changed");
        state.key = key;
        state.key_changed = true;
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }

    /// Read the active key's entry. When the cache needs a fetch, `fetcher`
    /// is called with the active key to build it.
    pub fn current<F, Fut>(&self, fetcher: F) -> CacheEntry<T>
    where
        F: FnOnce(&CacheKey) -> Fut,
        Fut: Future<Output = Result<T, DataError>> + Send + 'static,
    {
        let (key, enabled, retry, placeholder) = {
            let mut state = self.state.lock();
            let retry = state.enabled && std::mem::take(&mut state.key_changed);
            let placeholder = if self.config.retain_previous_on_key_change {
                state.last_data.clone()
            } else {
                None
            };
            (state.key.clone(), state.enabled, retry, placeholder)
        };

        let entry = if retry && self.cache.peek(&key).status == CacheStatus::Error {
            self.cache.refetch(&key, || fetcher(&key)).with_placeholder(placeholder)
        } else {
            let options = QueryOptions::new(self.config.with_enabled(enabled)).with_placeholder(placeholder);
            self.cache.get(&key, || fetcher(&key), &options)
        };

        if !entry.is_placeholder {
            if let Some(data) = &entry.data {
                self.state.lock().last_data = Some(data.clone());
            }
        }
        entry
    }

    /// Read the active key's entry without fetching
    pub fn peek(&self) -> CacheEntry<T> {
        let state = self.state.lock();
        let placeholder = if self.config.retain_previous_on_key_change {
            state.last_data.clone()
        } else {
            None
        };
        self.cache.peek(&state.key).with_placeholder(placeholder)
    }

    /// Wait for the active key to settle
    pub async fn settled(&self) -> CacheEntry<T> {
        let key = self.key();
        self.cache.settled(&key).await;
        self.peek()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::{Dimension, FilterSelection};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::runtime::Handle;
    use tokio::sync::oneshot;

    fn key(sector: &str) -> CacheKey {
        CacheKey::dashboard(FilterSelection::default().with(Dimension::Sector, Some(sector.into())))
    }

    fn fail() -> DataError {
        DataError::Fetch {
            path: "/test".into(),
            status: Some(500),
            body: "down".into(),
        }
    }

    #[tokio::test]
    async fn test_previous_data_retained_while_new_key_loads() {
        let cache: QueryCache<u32> = QueryCache::new("test", Handle::current());
        cache.set_query_data(&key("a"), 1);
        let observer = QueryObserver::new(cache.clone(), key("a"), CacheConfig::default());

        assert_eq!(observer.current(|_| async { Ok(0) }).data.as_deref(), Some(&1));

        let (tx, rx) = oneshot::channel::<u32>();
        observer.set_key(key("b"));
        let entry = observer.current(move |_| async move { rx.await.map_err(|_| fail()) });

        assert_eq!(entry.status, CacheStatus::Loading);
        assert_eq!(entry.data.as_deref(), Some(&1));
        assert!(entry.is_placeholder);

        tx.send(2).unwrap();
        let entry = observer.settled().await;
        assert_eq!(entry.data.as_deref(), Some(&2));
        assert!(!entry.is_placeholder);
    }

    #[tokio::test]
    async fn test_no_placeholder_when_not_retaining() {
        let cache: QueryCache<u32> = QueryCache::new("test", Handle::current());
        cache.set_query_data(&key("a"), 1);
        let observer = QueryObserver::new(cache, key("a"), CacheConfig::lookups());

        observer.current(|_| async { Ok(0) });
        observer.set_key(key("b"));
        let (_tx, rx) = oneshot::channel::<u32>();
        let entry = observer.current(move |_| async move { rx.await.map_err(|_| fail()) });

        assert!(entry.data.is_none());
        assert!(!entry.is_placeholder);
    }

    #[tokio::test]
    async fn test_gated_until_enabled() {
        let cache: QueryCache<u32> = QueryCache::new("test", Handle::current());
        let observer = QueryObserver::new(cache, key("a"), CacheConfig::dashboard());
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = |_: &CacheKey| {
            let calls = calls.clone();
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) as u32) }
        };

        assert_eq!(observer.current(fetcher).status, CacheStatus::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        observer.set_enabled(true);
        assert_eq!(observer.current(fetcher).status, CacheStatus::Loading);
        observer.settled().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_returning_to_failed_key_retries_once() {
        let cache: QueryCache<u32> = QueryCache::new("test", Handle::current());
        let observer = QueryObserver::new(cache.clone(), key("a"), CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let failing = |_: &CacheKey| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(fail())
            }
        };

        observer.current(failing);
        assert_eq!(observer.settled().await.status, CacheStatus::Error);

        // Re-reading the same key does not retry
        observer.current(failing);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        observer.set_key(key("b"));
        observer.current(|_| async { Ok(2) });
        observer.settled().await;

        observer.set_key(key("a"));
        let entry = observer.current(failing);
        assert_eq!(entry.status, CacheStatus::Loading);
        assert_eq!(entry.data.as_deref(), Some(&2));
        observer.settled().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_race_late_result_never_reaches_new_key() {
        let cache: QueryCache<u32> = QueryCache::new("test", Handle::current());
        let observer = QueryObserver::new(cache.clone(), key("a"), CacheConfig::default());

        let (tx_a, rx_a) = oneshot::channel::<u32>();
        let (tx_b, rx_b) = oneshot::channel::<u32>();
        observer.current(move |_| async move { rx_a.await.map_err(|_| fail()) });

        observer.set_key(key("b"));
        observer.current(move |_| async move { rx_b.await.map_err(|_| fail()) });

        // A resolves while B is still loading
        tx_a.send(1).unwrap();
        cache.settled(&key("a")).await;
        let entry = observer.peek();
        assert_eq!(entry.status, CacheStatus::Loading);
        assert_ne!(cache.peek(&key("b")).data.as_deref(), Some(&1));

        tx_b.send(2).unwrap();
        let entry = observer.settled().await;
        assert_eq!(entry.data.as_deref(), Some(&2));
        assert_eq!(cache.peek(&key("a")).data.as_deref(), Some(&1));
    }
}
