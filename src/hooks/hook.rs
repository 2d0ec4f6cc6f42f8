use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures::FutureExt;
use tracing::trace;

use crate::cache::lock::mutex_lock;
use crate::cache::{
    CacheEvent, CacheEventKind, EntryStatus, Fetcher, ResourceKey, SharedValue, Subscription,
};
use crate::client::ClientError;

use super::HookContext;
use super::source::HookSource;

const SOURCE: &str = "hooks::hook";

type Listener<V> = Arc<dyn Fn(&HookState<V>) + Send + Sync>;

/// What a view reads from a hook.
pub struct HookState<V> {
    /// Last good value for the current key, kept across errors.
    pub data: Option<Arc<V>>,
    pub error: Option<ClientError>,
    /// In flight with nothing to show yet.
    pub is_loading: bool,
    /// Any request in flight for the current key.
    pub is_validating: bool,
}

impl<V> HookState<V> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<V> Clone for HookState<V> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            is_validating: self.is_validating,
        }
    }
}

impl<V> Default for HookState<V> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            is_validating: false,
        }
    }
}

impl<V> fmt::Debug for HookState<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookState")
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("is_loading", &self.is_loading)
            .field("is_validating", &self.is_validating)
            .finish()
    }
}

struct Watch<S: HookSource> {
    input: S::Input,
    key: ResourceKey,
    subscription: Option<Subscription>,
    listeners: Vec<(u64, Listener<S::Value>)>,
}

struct HookInner<S: HookSource> {
    ctx: HookContext,
    source: S,
    watch: Mutex<Watch<S>>,
    next_listener: AtomicU64,
}

/// A mounted view of one cache key that follows its input.
///
/// Cloning shares the mount. The store subscription is released when the
/// last clone is dropped.
pub struct ResourceHook<S: HookSource> {
    inner: Arc<HookInner<S>>,
}

impl<S: HookSource> Clone for ResourceHook<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: HookSource> ResourceHook<S> {
    /// Subscribes to the key for `input` and starts a revalidation.
    pub fn mount(ctx: HookContext, source: S, input: S::Input) -> Self {
        let key = source.key(&input);
        let hook = Self {
            inner: Arc::new(HookInner {
                ctx,
                source,
                watch: Mutex::new(Watch {
                    input,
                    key: key.clone(),
                    subscription: None,
                    listeners: Vec::new(),
                }),
                next_listener: AtomicU64::new(1),
            }),
        };
        hook.attach(&key);
        hook.revalidate();
        hook
    }

    pub fn key(&self) -> ResourceKey {
        mutex_lock(&self.inner.watch, SOURCE, "key").key.clone()
    }

    pub fn query(&self) -> S::Input {
        mutex_lock(&self.inner.watch, SOURCE, "query").input.clone()
    }

    /// Current view of the store entry for this hook's key.
    pub fn state(&self) -> HookState<S::Value> {
        let key = self.key();
        let Some(entry) = self.inner.ctx.store().get(&key) else {
            return HookState::default();
        };
        let data = entry.value_as::<S::Value>();
        HookState {
            is_loading: entry.in_flight && data.is_none(),
            is_validating: entry.in_flight,
            error: (entry.status == EntryStatus::Errored)
                .then_some(entry.error)
                .flatten(),
            data,
        }
    }

    /// Awaits the value for the current key, joining any in-flight request.
    pub async fn resolve(&self) -> Result<Arc<S::Value>, ClientError> {
        let (key, input) = self.current();
        let value = self
            .inner
            .ctx
            .store()
            .fetch_erased(&key, self.fetcher(input))
            .await?;
        value.downcast::<S::Value>().map_err(|_| {
            ClientError::Decode(format!("cached value for `{key}` has an unexpected type"))
        })
    }

    /// Invalidates the current key and waits for the refetch.
    ///
    /// Failures surface through the returned state rather than an `Err`.
    pub async fn mutate(&self) -> HookState<S::Value> {
        let key = self.key();
        self.inner.ctx.store().invalidate(&key);
        if let Err(error) = self.resolve().await {
            trace!(target: "campus::hooks", key = %key, error = %error, "mutate settled with error");
        }
        self.state()
    }

    /// Switches to the key for `input`. Returns false when the input is unchanged.
    ///
    /// Data immediately reflects what the store holds for the new key; late
    /// results for the old key are ignored.
    pub fn set_query(&self, input: S::Input) -> bool {
        let key = self.inner.source.key(&input);
        let previous = {
            let mut watch = mutex_lock(&self.inner.watch, SOURCE, "set_query");
            if watch.input == input {
                return false;
            }
            watch.input = input;
            watch.key = key.clone();
            watch.subscription.take()
        };
        drop(previous);

        self.attach(&key);
        self.revalidate();
        self.emit();
        true
    }

    /// Registers a callback run with the fresh state after every relevant
    /// change of the current key.
    pub fn on_change(
        &self,
        callback: impl Fn(&HookState<S::Value>) + Send + Sync + 'static,
    ) -> HookListener {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        mutex_lock(&self.inner.watch, SOURCE, "on_change")
            .listeners
            .push((id, Arc::new(callback)));
        let weak: Weak<HookInner<S>> = Arc::downgrade(&self.inner);
        HookListener {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    mutex_lock(&inner.watch, SOURCE, "remove_listener")
                        .listeners
                        .retain(|(listener, _)| *listener != id);
                }
            })),
        }
    }

    pub fn downgrade(&self) -> WeakResourceHook<S> {
        WeakResourceHook {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn current(&self) -> (ResourceKey, S::Input) {
        let watch = mutex_lock(&self.inner.watch, SOURCE, "current");
        (watch.key.clone(), watch.input.clone())
    }

    fn fetcher(&self, input: S::Input) -> Fetcher {
        let source = self.inner.source.clone();
        let api = self.inner.ctx.api().clone();
        Arc::new(move || {
            source
                .fetch(&api, &input)
                .map(|outcome| outcome.map(|value| Arc::new(value) as SharedValue))
                .boxed()
        })
    }

    fn attach(&self, key: &ResourceKey) {
        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.ctx.store().subscribe(key, move |event| {
            if let Some(inner) = weak.upgrade() {
                ResourceHook { inner }.on_store_event(event);
            }
        });
        let mut watch = mutex_lock(&self.inner.watch, SOURCE, "attach");
        // A concurrent set_query may have moved on already; the stale
        // subscription is dropped here.
        if watch.key == *key {
            watch.subscription = Some(subscription);
        }
    }

    fn revalidate(&self) {
        let (key, input) = self.current();
        self.inner
            .ctx
            .store()
            .revalidate_erased(&key, self.fetcher(input));
    }

    fn on_store_event(&self, event: &CacheEvent) {
        if event.key != self.key() {
            trace!(target: "campus::hooks", key = %event.key, "ignored event for abandoned key");
            return;
        }
        if event.kind == CacheEventKind::Invalidated {
            trace!(target: "campus::hooks", key = %event.key, "current key invalidated");
        }
        self.emit();
    }

    fn emit(&self) {
        let listeners: Vec<Listener<S::Value>> = mutex_lock(&self.inner.watch, SOURCE, "emit")
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        if listeners.is_empty() {
            return;
        }
        let state = self.state();
        for listener in listeners {
            listener(&state);
        }
    }
}

/// Non-owning handle to a hook, used by bindings that must not keep it alive.
pub struct WeakResourceHook<S: HookSource> {
    inner: Weak<HookInner<S>>,
}

impl<S: HookSource> Clone for WeakResourceHook<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: HookSource> WeakResourceHook<S> {
    pub fn upgrade(&self) -> Option<ResourceHook<S>> {
        self.inner.upgrade().map(|inner| ResourceHook { inner })
    }
}

/// Removes its callback when dropped.
pub struct HookListener {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl HookListener {
    pub fn remove(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for HookListener {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}
