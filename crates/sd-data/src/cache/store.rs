//! Cache store implementation

use ahash::AHashMap;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CacheEntry, CacheKey, CacheStatus, QueryOptions};
use crate::config::CacheConfig;
use crate::model::DashboardData;
use crate::DataError;

type FetchResult<T> = Result<Arc<T>, DataError>;
type SharedFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;
type Listener<T> = Arc<dyn Fn(&CacheEntry<T>) + Send + Sync>;

struct Slot<T> {
    entry: CacheEntry<T>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    /// Bumped whenever a fetch starts or data is seeded; a fetch may only
    /// commit while its generation is still current.
    generation: u64,
    inflight: Option<SharedFetch<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            entry: CacheEntry::idle(),
            fetched_at: None,
            invalidated: false,
            generation: 0,
            inflight: None,
        }
    }

    fn is_stale(&self, stale_time: Option<Duration>) -> bool {
        if self.invalidated {
            return true;
        }
        match (stale_time, self.fetched_at) {
            (Some(limit), Some(at)) => at.elapsed() > limit,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn is_fresh(&self, stale_time: Option<Duration>) -> bool {
        self.entry.is_success() && self.entry.data.is_some() && !self.is_stale(stale_time)
    }
}

struct CacheInner<T> {
    name: &'static str,
    slots: Mutex<AHashMap<CacheKey, Slot<T>>>,
    listeners: RwLock<AHashMap<CacheKey, Vec<(Uuid, Listener<T>)>>>,
}

impl<T: Send + Sync + 'static> CacheInner<T> {
    /// Write a finished fetch into its own key's entry, unless superseded
    fn commit(&self, key: &CacheKey, generation: u64, result: &FetchResult<T>) {
        let entry = {
            let mut slots = self.slots.lock();
            let slot = match slots.get_mut(key) {
                Some(slot) if slot.generation == generation => slot,
                _ => {
                    debug!(cache = self.name, %key, generation, "Discarding superseded result");
                    return;
                }
            };

            slot.inflight = None;
            match result {
                Ok(data) => {
                    slot.entry.status = CacheStatus::Success;
                    slot.entry.data = Some(data.clone());
                    slot.entry.error = None;
                    slot.entry.last_fetched_at = Some(Utc::now());
                    slot.fetched_at = Some(Instant::now());
                    slot.invalidated = false;
                    debug!(cache = self.name, %key, "Committed result");
                }
                Err(e) => {
                    slot.entry.status = CacheStatus::Error;
                    slot.entry.error = Some(e.clone());
                    warn!(
                        cache = self.name,
                        %key,
                        error = %e,
                        retained = slot.entry.data.is_some(),
                        "Query failed"
                    );
                }
            }
            slot.entry.clone()
        };

        self.notify(key, &entry);
    }

    /// Invoke every listener of `key`. Must be called without holding `slots`.
    fn notify(&self, key: &CacheKey, entry: &CacheEntry<T>) {
        let listeners: Vec<Listener<T>> = self
            .listeners
            .read()
            .get(key)
            .map(|l| l.iter().map(|(_, f)| f.clone()).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(entry);
        }
    }

    fn remove_listener(&self, key: &CacheKey, id: Uuid) {
        let mut listeners = self.listeners.write();
        if let Some(list) = listeners.get_mut(key) {
            list.retain(|(listener_id, _)| *listener_id != id);
            if list.is_empty() {
                listeners.remove(key);
            }
        }
    }
}

/// Process-wide store of query entries for one result type.
///
/// Cheap to clone; clones share the same entries.
pub struct QueryCache<T> {
    inner: Arc<CacheInner<T>>,
    runtime: Handle,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    /// Create a new cache spawning its fetches on `runtime`
    pub fn new(name: &'static str, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                name,
                slots: Mutex::new(AHashMap::new()),
                listeners: RwLock::new(AHashMap::new()),
            }),
            runtime,
        }
    }

    /// Return the current entry for `key` and start a background fetch when
    /// needed.
    ///
    /// A fetch starts only if the query is enabled, nothing is in flight for
    /// the key, and the entry is idle, stale or invalidated. Errors are not
    /// retried here; see [`QueryCache::refetch`].
    pub fn get<F, Fut>(&self, key: &CacheKey, fetcher: F, options: &QueryOptions<T>) -> CacheEntry<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DataError>> + Send + 'static,
    {
        let (entry, started) = {
            let mut slots = self.inner.slots.lock();
            let slot = slots.entry(key.clone()).or_insert_with(Slot::new);

            let needs_fetch = options.config.enabled
                && slot.inflight.is_none()
                && match slot.entry.status {
                    CacheStatus::Idle => true,
                    CacheStatus::Success => slot.is_stale(options.config.stale_time),
                    CacheStatus::Error => slot.invalidated,
                    CacheStatus::Loading => false,
                };

            if needs_fetch {
                let _ = self.start_fetch(key, slot, fetcher());
            } else {
                debug!(cache = self.inner.name, %key, status = ?slot.entry.status, "Cache read");
            }
            (slot.entry.clone(), needs_fetch)
        };

        if started {
            self.inner.notify(key, &entry);
        }
        entry.with_placeholder(options.placeholder_data.clone())
    }

    /// Await data for `key`: fresh cached data is returned as is, an
    /// in-flight fetch is joined, otherwise a new fetch starts.
    ///
    /// Explicit fetches ignore `config.enabled`.
    pub async fn fetch<F, Fut>(&self, key: &CacheKey, fetcher: F, config: &CacheConfig) -> FetchResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DataError>> + Send + 'static,
    {
        let (shared, started) = {
            let mut slots = self.inner.slots.lock();
            let slot = slots.entry(key.clone()).or_insert_with(Slot::new);

            if slot.inflight.is_none() && slot.is_fresh(config.stale_time) {
                if let Some(data) = slot.entry.data.clone() {
                    debug!(cache = self.inner.name, %key, "Cache hit");
                    return Ok(data);
                }
            }

            match slot.inflight.clone() {
                Some(shared) => (shared, None),
                None => {
                    let shared = self.start_fetch(key, slot, fetcher());
                    (shared, Some(slot.entry.clone()))
                }
            }
        };

        if let Some(entry) = started {
            self.inner.notify(key, &entry);
        }
        shared.await
    }

    /// Explicitly re-invoke the query for `key`. Joins a fetch already in
    /// flight instead of starting a second one.
    pub fn refetch<F, Fut>(&self, key: &CacheKey, fetcher: F) -> CacheEntry<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DataError>> + Send + 'static,
    {
        let (entry, started) = {
            let mut slots = self.inner.slots.lock();
            let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
            let started = slot.inflight.is_none();
            if started {
                let _ = self.start_fetch(key, slot, fetcher());
            }
            (slot.entry.clone(), started)
        };

        if started {
            self.inner.notify(key, &entry);
        }
        entry
    }

    /// Seed `key` with data. Any fetch still in flight for the key is
    /// superseded and its result discarded.
    pub fn set_query_data(&self, key: &CacheKey, data: T) {
        let entry = {
            let mut slots = self.inner.slots.lock();
            let slot = slots.entry(key.clone()).or_insert_with(Slot::new);

            slot.generation += 1;
            slot.inflight = None;
            slot.invalidated = false;
            slot.fetched_at = Some(Instant::now());
            slot.entry = CacheEntry {
                status: CacheStatus::Success,
                data: Some(Arc::new(data)),
                error: None,
                last_fetched_at: Some(Utc::now()),
                is_placeholder: false,
            };
            slot.entry.clone()
        };

        debug!(cache = self.inner.name, %key, "Seeded entry");
        self.inner.notify(key, &entry);
    }

    /// Mark `key` stale so the next enabled read refetches it
    pub fn invalidate(&self, key: &CacheKey) {
        if let Some(slot) = self.inner.slots.lock().get_mut(key) {
            slot.invalidated = true;
        }
    }

    /// Current entry for `key` without side effects
    pub fn peek(&self, key: &CacheKey) -> CacheEntry<T> {
        self.inner
            .slots
            .lock()
            .get(key)
            .map(|slot| slot.entry.clone())
            .unwrap_or_else(CacheEntry::idle)
    }

    /// Wait until nothing is in flight for `key` and return its entry
    pub async fn settled(&self, key: &CacheKey) -> CacheEntry<T> {
        loop {
            let inflight = self
                .inner
                .slots
                .lock()
                .get(key)
                .and_then(|slot| slot.inflight.clone());

            match inflight {
                Some(shared) => {
                    let _ = shared.await;
                }
                None => return self.peek(key),
            }
        }
    }

    /// Call `listener` on every mutation of `key`'s entry until the returned
    /// subscription is dropped or unsubscribed.
    pub fn subscribe<F>(&self, key: &CacheKey, listener: F) -> Subscription
    where
        F: Fn(&CacheEntry<T>) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.inner
            .listeners
            .write()
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(listener)));

        let inner: Weak<CacheInner<T>> = Arc::downgrade(&self.inner);
        let key = key.clone();
        Subscription {
            id,
            cancel: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.remove_listener(&key, id);
                }
            })),
        }
    }

    /// Number of keys with an entry
    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move `slot` to loading and start `future` as the key's shared fetch.
    ///
    /// The fetch commits itself when it resolves, so it is driven to
    /// completion by the spawned task even if no caller awaits it.
    fn start_fetch<Fut>(&self, key: &CacheKey, slot: &mut Slot<T>, future: Fut) -> SharedFetch<T>
    where
        Fut: Future<Output = Result<T, DataError>> + Send + 'static,
    {
        slot.generation += 1;
        slot.entry.status = CacheStatus::Loading;
        slot.entry.is_placeholder = false;

        let generation = slot.generation;
        let inner = Arc::downgrade(&self.inner);
        let commit_key = key.clone();
        let shared = async move {
            let result = future.await.map(Arc::new);
            if let Some(inner) = inner.upgrade() {
                inner.commit(&commit_key, generation, &result);
            }
            result
        }
        .boxed()
        .shared();

        slot.inflight = Some(shared.clone());
        let driver = shared.clone();
        self.runtime.spawn(async move {
            let _ = driver.await;
        });

        debug!(cache = self.inner.name, %key, generation, "Fetch started");
        shared
    }
}

/// Handle returned by [`QueryCache::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    id: Uuid,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Every query cache of one application, constructed once at startup and
/// passed to its consumers.
#[derive(Clone)]
pub struct CacheStore {
    pub dashboards: QueryCache<DashboardData>,
    pub lookups: QueryCache<Vec<String>>,
}

impl CacheStore {
    /// Create a new store spawning fetches on `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            dashboards: QueryCache::new("dashboards", runtime.clone()),
            lookups: QueryCache::new("lookups", runtime),
        }
    }
}
