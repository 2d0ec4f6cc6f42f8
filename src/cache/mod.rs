//! Campus cache-and-revalidate store
//!
//! A process-wide keyed cache of request results:
//!
//! - **Deduplication**: concurrent requests for one [`ResourceKey`] share a
//!   single in-flight future
//! - **Stale-while-revalidate**: cached values are served immediately while
//!   a background refresh runs once the deduping interval has passed
//! - **Subscriptions**: callbacks observe every state change of a key
//!
//! ## Configuration
//!
//! Controlled via the `[cache]` section of `campus.toml`:
//!
//! ```toml
//! [cache]
//! deduping_interval_ms = 2000
//! idle_ttl_seconds = 300
//! max_entries = 256
//! janitor_interval_seconds = 60
//! ```

mod config;
mod entry;
mod keys;
pub(crate) mod lock;
mod store;

pub use config::CacheConfig;
pub use entry::{CacheEntry, CacheEvent, CacheEventKind, EntryStatus, SharedValue};
pub use keys::ResourceKey;
pub use store::{CacheStore, Fetcher, Subscription};
