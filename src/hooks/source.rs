use std::marker::PhantomData;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::cache::ResourceKey;
use crate::client::{ClientError, Resource, ResourceApi};
use crate::domain::{ListQuery, PaginatedResult};

/// What a hook fetches: how an input maps to a cache key and a request.
///
/// Sources are cloned into the producer kept by the store, so they must not
/// own the store themselves.
pub trait HookSource: Clone + Send + Sync + 'static {
    type Input: Clone + PartialEq + Send + Sync + 'static;
    type Value: Send + Sync + 'static;

    fn resource(&self) -> Resource;

    fn key(&self, input: &Self::Input) -> ResourceKey;

    fn fetch(
        &self,
        api: &ResourceApi,
        input: &Self::Input,
    ) -> BoxFuture<'static, Result<Self::Value, ClientError>>;
}

/// Paginated collection endpoint, e.g. `GET /blogs?tag=math&page=2`.
pub struct ListSource<T> {
    resource: Resource,
    _entity: PhantomData<fn() -> T>,
}

impl<T> ListSource<T> {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for ListSource<T> {
    fn clone(&self) -> Self {
        Self::new(self.resource)
    }
}

impl<T> HookSource for ListSource<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Input = ListQuery;
    type Value = PaginatedResult<T>;

    fn resource(&self) -> Resource {
        self.resource
    }

    fn key(&self, input: &ListQuery) -> ResourceKey {
        ResourceKey::collection(self.resource, input)
    }

    fn fetch(
        &self,
        api: &ResourceApi,
        input: &ListQuery,
    ) -> BoxFuture<'static, Result<PaginatedResult<T>, ClientError>> {
        let api = api.clone();
        let query = input.clone();
        let resource = self.resource;
        async move { api.list(resource, &query).await }.boxed()
    }
}

/// Single-entity endpoint, e.g. `GET /blogs/{slug}`.
pub struct ItemSource<T> {
    resource: Resource,
    _entity: PhantomData<fn() -> T>,
}

impl<T> ItemSource<T> {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for ItemSource<T> {
    fn clone(&self) -> Self {
        Self::new(self.resource)
    }
}

impl<T> HookSource for ItemSource<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Input = String;
    type Value = T;

    fn resource(&self) -> Resource {
        self.resource
    }

    fn key(&self, input: &String) -> ResourceKey {
        ResourceKey::item(self.resource, input.as_str())
    }

    fn fetch(&self, api: &ResourceApi, input: &String) -> BoxFuture<'static, Result<T, ClientError>> {
        let api = api.clone();
        let id = input.clone();
        let resource = self.resource;
        async move { api.show(resource, &id).await }.boxed()
    }
}
