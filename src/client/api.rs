use std::sync::Arc;

use campus_api_types::{ItemEnvelope, ListEnvelope};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{ListQuery, PaginatedResult, QueryParams};

use super::{ClientError, Resource, ResourceClient};

/// Typed operations over a [`ResourceClient`].
#[derive(Clone)]
pub struct ResourceApi {
    client: Arc<dyn ResourceClient>,
}

impl ResourceApi {
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        Self { client }
    }

    /// `GET /{resource}` with the query's filters and page.
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        query: &ListQuery,
    ) -> Result<PaginatedResult<T>, ClientError> {
        let body = self
            .client
            .get_json(resource.path(), &query.params())
            .await?;
        let envelope: ListEnvelope<T> = serde_json::from_value(body)?;
        Ok(PaginatedResult::from_envelope(envelope)?)
    }

    /// `GET /{resource}/{id}`; `id` may be a numeric id or a slug.
    pub async fn show<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<T, ClientError> {
        let path = item_path(resource, id)?;
        let body = self.client.get_json(&path, &QueryParams::new()).await?;
        let envelope: ItemEnvelope<T> = serde_json::from_value(body)?;
        Ok(envelope.into_inner())
    }

    pub async fn create<B: Serialize, T: DeserializeOwned>(
        &self,
        resource: Resource,
        body: &B,
    ) -> Result<T, ClientError> {
        self.write(Method::POST, resource.path().to_string(), body)
            .await
    }

    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.write(Method::PUT, item_path(resource, id)?, body).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.write(Method::PATCH, item_path(resource, id)?, body)
            .await
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<(), ClientError> {
        let path = item_path(resource, id)?;
        self.client.send_json(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn write<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: &B,
    ) -> Result<T, ClientError> {
        let payload = serde_json::to_value(body)
            .map_err(|err| ClientError::InvalidRequest(err.to_string()))?;
        let response = self
            .client
            .send_json(method, &path, Some(payload))
            .await?
            .ok_or_else(|| ClientError::Decode(format!("empty response from `{path}`")))?;
        let envelope: ItemEnvelope<T> = serde_json::from_value(response)?;
        Ok(envelope.into_inner())
    }
}

fn item_path(resource: Resource, id: &str) -> Result<String, ClientError> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#', '%']) || id.chars().any(char::is_whitespace)
    {
        return Err(ClientError::InvalidRequest(format!(
            "`{id}` is not a valid {resource} identifier"
        )));
    }
    Ok(format!("{}/{id}", resource.path()))
}
