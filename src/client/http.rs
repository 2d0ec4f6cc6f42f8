use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use tracing::{debug, warn};

use crate::domain::QueryParams;

use super::{ClientError, ResourceClient};

const TARGET: &str = "campus::client";

/// [`ResourceClient`] over HTTP(S) with an optional bearer token.
#[derive(Clone, Debug)]
pub struct HttpResourceClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpResourceClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        // Keep any path prefix (`/api`) when joining relative resource paths.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            token,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("campus/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn auth_header(&self) -> Result<Option<HeaderValue>, ClientError> {
        self.token
            .as_ref()
            .map(|token| {
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| ClientError::InvalidRequest(e.to_string()))
            })
            .transpose()
    }

    pub fn url(&self, path: &str, query: Option<&QueryParams>) -> Result<Url, ClientError> {
        let mut url = self.base.join(path.trim_start_matches('/'))?;
        url.set_query(None);
        if let Some(params) = query.filter(|params| !params.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params.iter() {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, ClientError> {
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(auth) = self.auth_header()? {
            request = request.header(AUTHORIZATION, auth);
        }
        Ok(request)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        let mut request = self.request(method.clone(), url.clone())?;
        if let Some(body) = body {
            request = request.json(&body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|err| {
            warn!(
                target: TARGET,
                method = %method,
                url = %url,
                error = %err,
                "api request failed before a response arrived"
            );
            ClientError::from(err)
        })?;

        debug!(
            target: TARGET,
            method = %method,
            url = %url,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "api request completed"
        );
        Self::handle(response).await
    }

    async fn handle(response: Response) -> Result<Option<serde_json::Value>, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::from_response(status.as_u16(), &bytes));
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let value = serde_json::from_slice(&bytes)?;
        Ok(Some(value))
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn get_json(
        &self,
        path: &str,
        query: &QueryParams,
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.url(path, Some(query))?;
        self.execute(Method::GET, url, None)
            .await?
            .ok_or_else(|| ClientError::Decode(format!("empty response from `{path}`")))
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        let url = self.url(path, None)?;
        self.execute(method, url, body).await
    }
}
