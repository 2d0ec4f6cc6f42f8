use std::any::Any;
use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::client::ClientError;

use super::keys::ResourceKey;

/// Type-erased cached value. Hooks downcast it to their concrete type.
pub type SharedValue = Arc<dyn Any + Send + Sync>;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Created by a subscription; nothing fetched yet.
    Idle,
    /// A request is in flight. A previous value may still be held.
    Pending,
    Resolved,
    Errored,
}

/// Point-in-time view of an entry.
#[derive(Clone)]
pub struct CacheEntry {
    pub key: ResourceKey,
    pub status: EntryStatus,
    /// Last good value; kept across errors and revalidations.
    pub value: Option<SharedValue>,
    pub error: Option<ClientError>,
    pub last_fetched_at: Option<OffsetDateTime>,
    /// Invalidated since it last settled.
    pub stale: bool,
    pub in_flight: bool,
    pub subscribers: usize,
}

impl CacheEntry {
    pub fn value_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone()?.downcast::<T>().ok()
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("status", &self.status)
            .field("has_value", &self.value.is_some())
            .field("error", &self.error)
            .field("last_fetched_at", &self.last_fetched_at)
            .field("stale", &self.stale)
            .field("in_flight", &self.in_flight)
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

/// What happened to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    Pending,
    Resolved,
    Errored,
    Invalidated,
}

/// Notification delivered to subscribers of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: ResourceKey,
    pub kind: CacheEventKind,
}
