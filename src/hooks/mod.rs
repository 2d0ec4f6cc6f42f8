//! Resource hooks: per-resource views over the cache store.
//!
//! A hook turns a resource and its input (a [`ListQuery`](crate::domain::ListQuery)
//! or an item id) into a [`ResourceKey`](crate::cache::ResourceKey), subscribes to
//! it and serves `{data, error, is_loading, is_validating}` from the shared
//! [`CacheStore`]. Hooks mounted with equivalent inputs share one request.

mod hook;
mod resources;
mod source;

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheConfig, CacheStore};
use crate::client::{Resource, ResourceApi, ResourceClient};

pub use hook::{HookListener, HookState, ResourceHook, WeakResourceHook};
pub use resources::{
    ItemHook, ListHook, use_academic_year, use_academic_years, use_blog, use_blogs, use_domain,
    use_domains, use_formation, use_formations, use_item, use_list, use_mention, use_mentions,
    use_offering, use_offerings, use_tag, use_tags, use_writer, use_writers,
};
pub use source::{HookSource, ItemSource, ListSource};

/// Everything a hook needs: the shared store and the API it fetches through.
#[derive(Clone)]
pub struct HookContext {
    store: CacheStore,
    api: ResourceApi,
}

impl HookContext {
    pub fn new(store: CacheStore, api: ResourceApi) -> Self {
        Self { store, api }
    }

    /// Builds a fresh store around `client`.
    pub fn from_client(client: Arc<dyn ResourceClient>, config: CacheConfig) -> Self {
        Self::new(CacheStore::new(config), ResourceApi::new(client))
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn api(&self) -> &ResourceApi {
        &self.api
    }

    /// Invalidates every cached list and item of `resource` after a write
    /// made through [`ResourceApi`]. Mounted hooks refetch.
    pub fn after_write(&self, resource: Resource) -> usize {
        let invalidated = self.store.invalidate_resource(resource);
        debug!(
            target: "campus::hooks",
            resource = %resource,
            invalidated,
            "invalidated after write"
        );
        invalidated
    }
}
