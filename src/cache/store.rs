//! Keyed cache of in-flight and settled request results.
//!
//! One [`CacheStore`] is created at process start and shared by cloning the
//! handle. Concurrent requests for the same key join a single shared future;
//! settled values are served for the deduping interval and refreshed in the
//! background afterwards.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use metrics::{counter, gauge, histogram};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{ClientError, Resource};

use super::config::CacheConfig;
use super::entry::{CacheEntry, CacheEvent, CacheEventKind, EntryStatus, SharedValue};
use super::keys::ResourceKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";
const TARGET: &str = "campus::cache";

type Outcome = Result<SharedValue, ClientError>;
type SharedFetch = Shared<BoxFuture<'static, Outcome>>;
type Callback = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Type-erased producer kept on the entry so invalidation can refetch.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Outcome> + Send + Sync>;

struct Slot {
    status: EntryStatus,
    value: Option<SharedValue>,
    error: Option<ClientError>,
    last_fetched_at: Option<OffsetDateTime>,
    settled_at: Option<Instant>,
    last_access: Instant,
    stale: bool,
    /// Token of the request whose result this slot accepts.
    generation: u64,
    in_flight: Option<SharedFetch>,
    fetcher: Option<Fetcher>,
    subscribers: Vec<(u64, Callback)>,
}

impl Slot {
    fn new(now: Instant) -> Self {
        Self {
            status: EntryStatus::Idle,
            value: None,
            error: None,
            last_fetched_at: None,
            settled_at: None,
            last_access: now,
            stale: false,
            generation: 0,
            in_flight: None,
            fetcher: None,
            subscribers: Vec::new(),
        }
    }

    fn is_fresh(&self, config: &CacheConfig, now: Instant) -> bool {
        !self.stale
            && self
                .settled_at
                .is_some_and(|at| now.duration_since(at) < config.deduping_interval())
    }

    fn is_observed(&self) -> bool {
        !self.subscribers.is_empty() || self.in_flight.is_some()
    }

    fn settled_status(&self) -> EntryStatus {
        if self.error.is_some() {
            EntryStatus::Errored
        } else if self.value.is_some() {
            EntryStatus::Resolved
        } else {
            EntryStatus::Idle
        }
    }

    fn listeners(&self) -> Vec<Callback> {
        self.subscribers.iter().map(|(_, cb)| cb.clone()).collect()
    }

    fn snapshot(&self, key: &ResourceKey) -> CacheEntry {
        CacheEntry {
            key: key.clone(),
            status: self.status,
            value: self.value.clone(),
            error: self.error.clone(),
            last_fetched_at: self.last_fetched_at,
            stale: self.stale,
            in_flight: self.in_flight.is_some(),
            subscribers: self.subscribers.len(),
        }
    }
}

struct StoreInner {
    config: CacheConfig,
    entries: Mutex<LruCache<ResourceKey, Slot>>,
    next_generation: AtomicU64,
    next_subscriber: AtomicU64,
}

/// Cloneable handle to the shared cache.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<StoreInner>,
}

enum Plan {
    Hit(SharedValue),
    Join(SharedFetch),
    Start(SharedFetch, Vec<Callback>),
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                config,
                entries: Mutex::new(LruCache::unbounded()),
                next_generation: AtomicU64::new(1),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Snapshot of the entry for `key`, without touching its recency.
    pub fn get(&self, key: &ResourceKey) -> Option<CacheEntry> {
        let entries = mutex_lock(&self.inner.entries, SOURCE, "get");
        entries.peek(key).map(|slot| slot.snapshot(key))
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.inner.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry nobody observes and returns how many went.
    ///
    /// Subscribed or in-flight entries stay so their hooks keep receiving
    /// invalidations.
    pub fn clear(&self) -> usize {
        let mut entries = mutex_lock(&self.inner.entries, SOURCE, "clear");
        let unobserved: Vec<ResourceKey> = entries
            .iter()
            .filter(|(_, slot)| !slot.is_observed())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &unobserved {
            entries.pop(key);
        }
        gauge!("campus_cache_entries").set(entries.len() as f64);
        unobserved.len()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Returns the value for `key`, joining an in-flight request or starting one.
    ///
    /// A Resolved entry settled within the deduping interval and not
    /// invalidated is returned without calling `producer`.
    pub async fn fetch_or_join<T, F, Fut>(
        &self,
        key: &ResourceKey,
        producer: F,
    ) -> Result<Arc<T>, ClientError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let value = self.fetch_erased(key, erase(producer)).await?;
        downcast(key, value)
    }

    pub async fn fetch_erased(&self, key: &ResourceKey, fetcher: Fetcher) -> Outcome {
        let plan = {
            let now = Instant::now();
            let mut entries = mutex_lock(&self.inner.entries, SOURCE, "fetch_or_join");
            let slot = self.slot_mut(&mut entries, key, now);
            slot.last_access = now;
            slot.fetcher = Some(fetcher.clone());

            if let Some(in_flight) = &slot.in_flight {
                Plan::Join(in_flight.clone())
            } else if slot.status == EntryStatus::Resolved
                && slot.is_fresh(&self.inner.config, now)
                && let Some(value) = slot.value.clone()
            {
                Plan::Hit(value)
            } else {
                let fut = self.begin(key, slot, fetcher);
                Plan::Start(fut, slot.listeners())
            }
        };

        let resource = key.resource().path();
        match plan {
            Plan::Hit(value) => {
                counter!("campus_cache_hit_total", "resource" => resource).increment(1);
                Ok(value)
            }
            Plan::Join(fut) => {
                counter!("campus_cache_join_total", "resource" => resource).increment(1);
                fut.await
            }
            Plan::Start(fut, listeners) => {
                counter!("campus_cache_miss_total", "resource" => resource).increment(1);
                self.after_insert();
                notify(&listeners, key, CacheEventKind::Pending);
                spawn_detached(fut.clone());
                fut.await
            }
        }
    }

    /// Stale-while-revalidate read.
    ///
    /// Returns whatever is cached for `key` right away and starts a background
    /// refresh when the entry is missing, invalidated or past the deduping
    /// interval and nothing is in flight. Must run inside a tokio runtime.
    pub fn revalidate<T, F, Fut>(&self, key: &ResourceKey, producer: F) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let value = self.revalidate_erased(key, erase(producer))?;
        downcast(key, value).ok()
    }

    pub fn revalidate_erased(&self, key: &ResourceKey, fetcher: Fetcher) -> Option<SharedValue> {
        let (value, started) = {
            let now = Instant::now();
            let mut entries = mutex_lock(&self.inner.entries, SOURCE, "revalidate");
            let slot = self.slot_mut(&mut entries, key, now);
            slot.last_access = now;
            slot.fetcher = Some(fetcher.clone());

            let value = slot.value.clone();
            let started = if slot.in_flight.is_none() && !slot.is_fresh(&self.inner.config, now) {
                let fut = self.begin(key, slot, fetcher);
                Some((fut, slot.listeners()))
            } else {
                None
            };
            (value, started)
        };

        let resource = key.resource().path();
        match started {
            Some((fut, listeners)) => {
                counter!("campus_cache_miss_total", "resource" => resource).increment(1);
                self.after_insert();
                notify(&listeners, key, CacheEventKind::Pending);
                spawn_detached(fut);
            }
            None if value.is_some() => {
                counter!("campus_cache_hit_total", "resource" => resource).increment(1);
            }
            None => {
                counter!("campus_cache_join_total", "resource" => resource).increment(1);
            }
        }
        value
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Marks `key` stale, abandons its in-flight request and refetches it
    /// when someone is subscribed. Returns false if the key is unknown.
    pub fn invalidate(&self, key: &ResourceKey) -> bool {
        let (listeners, refetch) = {
            let mut entries = mutex_lock(&self.inner.entries, SOURCE, "invalidate");
            let Some(slot) = entries.peek_mut(key) else {
                return false;
            };
            slot.stale = true;
            slot.generation = self.next_generation();
            if slot.in_flight.take().is_some() {
                debug!(target: TARGET, key = %key, "abandoned in-flight request");
            }
            slot.status = slot.settled_status();

            let refetch = if slot.subscribers.is_empty() {
                None
            } else {
                slot.fetcher
                    .clone()
                    .map(|fetcher| self.begin(key, slot, fetcher))
            };
            (slot.listeners(), refetch)
        };

        debug!(
            target: TARGET,
            key = %key,
            refetch = refetch.is_some(),
            "cache entry invalidated"
        );
        notify(&listeners, key, CacheEventKind::Invalidated);
        if let Some(fut) = refetch {
            notify(&listeners, key, CacheEventKind::Pending);
            spawn_detached(fut);
        }
        true
    }

    /// Invalidates every key accepted by `predicate`; returns how many matched.
    pub fn invalidate_matching(&self, predicate: impl Fn(&ResourceKey) -> bool) -> usize {
        let keys: Vec<ResourceKey> = {
            let entries = mutex_lock(&self.inner.entries, SOURCE, "invalidate_matching");
            entries
                .iter()
                .map(|(key, _)| key)
                .filter(|key| predicate(*key))
                .cloned()
                .collect()
        };
        keys.iter().filter(|key| self.invalidate(key)).count()
    }

    /// Invalidates every list and item key of `resource`.
    pub fn invalidate_resource(&self, resource: Resource) -> usize {
        self.invalidate_matching(|key| key.resource() == resource)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Registers `callback` for state changes of `key`, creating an Idle
    /// entry when needed. The callback runs outside the store lock.
    pub fn subscribe(
        &self,
        key: &ResourceKey,
        callback: impl Fn(&CacheEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        {
            let now = Instant::now();
            let mut entries = mutex_lock(&self.inner.entries, SOURCE, "subscribe");
            let slot = self.slot_mut(&mut entries, key, now);
            slot.last_access = now;
            slot.subscribers.push((id, Arc::new(callback)));
        }
        self.after_insert();
        Subscription {
            store: Arc::downgrade(&self.inner),
            key: key.clone(),
            id,
            active: true,
        }
    }

    // ========================================================================
    // Eviction
    // ========================================================================

    /// Drops unobserved entries idle for at least the idle TTL.
    pub fn prune_idle(&self) -> usize {
        let ttl = self.inner.config.idle_ttl();
        let now = Instant::now();
        let mut entries = mutex_lock(&self.inner.entries, SOURCE, "prune_idle");
        let expired: Vec<ResourceKey> = entries
            .iter()
            .filter(|(_, slot)| !slot.is_observed() && now.duration_since(slot.last_access) >= ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        gauge!("campus_cache_entries").set(entries.len() as f64);
        if !expired.is_empty() {
            counter!("campus_cache_evict_total", "reason" => "idle")
                .increment(expired.len() as u64);
            debug!(target: TARGET, pruned = expired.len(), "pruned idle cache entries");
        }
        expired.len()
    }

    /// Runs [`prune_idle`](Self::prune_idle) every janitor interval until the
    /// last store handle is dropped.
    pub fn spawn_janitor(&self) -> JoinHandle<()> {
        let store = Arc::downgrade(&self.inner);
        let period = self.inner.config.janitor_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inner) = store.upgrade() else {
                    break;
                };
                CacheStore { inner }.prune_idle();
            }
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn next_generation(&self) -> u64 {
        self.inner.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    fn slot_mut<'a>(
        &self,
        entries: &'a mut LruCache<ResourceKey, Slot>,
        key: &ResourceKey,
        now: Instant,
    ) -> &'a mut Slot {
        entries.get_or_insert_mut(key.clone(), || Slot::new(now))
    }

    /// Starts a request under a fresh generation and stores its shared future.
    fn begin(&self, key: &ResourceKey, slot: &mut Slot, fetcher: Fetcher) -> SharedFetch {
        let generation = self.next_generation();
        slot.generation = generation;
        slot.status = EntryStatus::Pending;

        let store = Arc::downgrade(&self.inner);
        let settle_key = key.clone();
        let fut = async move {
            let started = Instant::now();
            let outcome = fetcher().await;
            histogram!("campus_fetch_ms", "resource" => settle_key.resource().path())
                .record(started.elapsed().as_secs_f64() * 1000.0);
            if let Some(inner) = store.upgrade() {
                CacheStore { inner }.settle(&settle_key, generation, &outcome);
            }
            outcome
        }
        .boxed()
        .shared();

        slot.in_flight = Some(fut.clone());
        fut
    }

    fn settle(&self, key: &ResourceKey, generation: u64, outcome: &Outcome) {
        let (listeners, kind) = {
            let mut entries = mutex_lock(&self.inner.entries, SOURCE, "settle");
            let Some(slot) = entries
                .peek_mut(key)
                .filter(|slot| slot.generation == generation)
            else {
                counter!("campus_cache_discarded_total", "resource" => key.resource().path())
                    .increment(1);
                debug!(target: TARGET, key = %key, "discarded superseded result");
                return;
            };

            let now = Instant::now();
            slot.in_flight = None;
            slot.settled_at = Some(now);
            slot.last_access = now;
            slot.stale = false;
            let kind = match outcome {
                Ok(value) => {
                    slot.status = EntryStatus::Resolved;
                    slot.value = Some(value.clone());
                    slot.error = None;
                    slot.last_fetched_at = Some(OffsetDateTime::now_utc());
                    CacheEventKind::Resolved
                }
                Err(error) => {
                    warn!(
                        target: TARGET,
                        key = %key,
                        error = %error,
                        kept_value = slot.value.is_some(),
                        "fetch failed"
                    );
                    slot.status = EntryStatus::Errored;
                    slot.error = Some(error.clone());
                    CacheEventKind::Errored
                }
            };
            (slot.listeners(), kind)
        };
        notify(&listeners, key, kind);
    }

    /// Evicts least recently used unobserved entries above capacity.
    fn after_insert(&self) {
        let cap = self.inner.config.max_entries_non_zero().get();
        let mut entries = mutex_lock(&self.inner.entries, SOURCE, "evict");
        if entries.len() > cap {
            let excess = entries.len() - cap;
            let victims: Vec<ResourceKey> = entries
                .iter()
                .rev()
                .filter(|(_, slot)| !slot.is_observed())
                .take(excess)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &victims {
                entries.pop(key);
            }
            if !victims.is_empty() {
                counter!("campus_cache_evict_total", "reason" => "capacity")
                    .increment(victims.len() as u64);
            }
        }
        gauge!("campus_cache_entries").set(entries.len() as f64);
    }

    fn unsubscribe(inner: &StoreInner, key: &ResourceKey, id: u64) {
        let mut entries = mutex_lock(&inner.entries, SOURCE, "unsubscribe");
        if let Some(slot) = entries.peek_mut(key) {
            slot.subscribers.retain(|(sub, _)| *sub != id);
            slot.last_access = Instant::now();
        }
    }
}

/// Handle returned by [`CacheStore::subscribe`]; unsubscribes on drop.
pub struct Subscription {
    store: Weak<StoreInner>,
    key: ResourceKey,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        if let Some(inner) = self.store.upgrade() {
            CacheStore::unsubscribe(&inner, &self.key, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

fn notify(listeners: &[Callback], key: &ResourceKey, kind: CacheEventKind) {
    if listeners.is_empty() {
        return;
    }
    let event = CacheEvent {
        key: key.clone(),
        kind,
    };
    for listener in listeners {
        listener(&event);
    }
}

/// Drives `fut` to completion even if every caller stops awaiting it.
fn spawn_detached(fut: SharedFetch) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
        }
        Err(_) => {
            warn!(
                target: TARGET,
                "no tokio runtime; request runs only while awaited"
            );
        }
    }
}

fn erase<T, F, Fut>(producer: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    Arc::new(move || {
        let fut = producer();
        async move { fut.await.map(|value| Arc::new(value) as SharedValue) }.boxed()
    })
}

fn downcast<T: Send + Sync + 'static>(
    key: &ResourceKey,
    value: SharedValue,
) -> Result<Arc<T>, ClientError> {
    value.downcast::<T>().map_err(|_| {
        ClientError::Decode(format!("cached value for `{key}` has an unexpected type"))
    })
}
