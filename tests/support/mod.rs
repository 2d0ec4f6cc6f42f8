//! In-memory stand-in for the content API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use campus::cache::CacheConfig;
use campus::client::{ClientError, ResourceClient};
use campus::domain::QueryParams;
use campus::hooks::HookContext;
use reqwest::Method;
use serde_json::{Value, json};

/// Serves `tags` from memory and records every request it receives.
pub struct FakeApi {
    tags: Mutex<Vec<Value>>,
    calls: Mutex<Vec<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    default_delay: Duration,
    failure: Mutex<Option<ClientError>>,
}

impl FakeApi {
    pub fn with_tags(count: u64) -> Arc<Self> {
        Arc::new(Self {
            tags: Mutex::new((1..=count).map(tag).collect()),
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
            default_delay: Duration::from_millis(10),
            failure: Mutex::new(None),
        })
    }

    pub fn context(self: &Arc<Self>) -> HookContext {
        HookContext::from_client(self.clone(), CacheConfig::default())
    }

    /// Requests recorded as `path` or `path?query`, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls").len()
    }

    /// Delays responses for requests whose rendered query equals `query`.
    pub fn delay(&self, query: &str, delay: Duration) {
        self.delays
            .lock()
            .expect("delays")
            .insert(query.to_string(), delay);
    }

    pub fn fail_with(&self, error: Option<ClientError>) {
        *self.failure.lock().expect("failure") = error;
    }

    pub fn push_tag(&self, name: &str) -> Value {
        let mut tags = self.tags.lock().expect("tags");
        let value = json!({ "id": tags.len() as u64 + 1, "name": name });
        tags.push(value.clone());
        value
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls").push(call);
    }

    fn list(&self, query: &QueryParams) -> Value {
        let tags = self.tags.lock().expect("tags").clone();
        let matching: Vec<Value> = match query.get("search") {
            Some(needle) => tags
                .into_iter()
                .filter(|tag| tag["name"].as_str().is_some_and(|name| name.contains(needle)))
                .collect(),
            None => tags,
        };

        let per_page: usize = query
            .get("per_page")
            .and_then(|value| value.parse().ok())
            .unwrap_or(10);
        let page: usize = query
            .get("page")
            .and_then(|value| value.parse().ok())
            .unwrap_or(1);
        let total = matching.len();
        let last_page = total.div_ceil(per_page).max(1);
        let data: Vec<Value> = matching
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        json!({
            "data": data,
            "meta": {
                "total": total,
                "current_page": page,
                "last_page": last_page,
                "per_page": per_page
            }
        })
    }
}

#[async_trait]
impl ResourceClient for FakeApi {
    async fn get_json(&self, path: &str, query: &QueryParams) -> Result<Value, ClientError> {
        let rendered = query.to_string();
        self.record(if rendered.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{rendered}")
        });

        let delay = self
            .delays
            .lock()
            .expect("delays")
            .get(&rendered)
            .copied()
            .unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        if let Some(error) = self.failure.lock().expect("failure").clone() {
            return Err(error);
        }

        match path.strip_prefix("tags/") {
            Some(id) => self
                .tags
                .lock()
                .expect("tags")
                .iter()
                .find(|tag| tag["id"].to_string() == id)
                .map(|tag| json!({ "data": tag }))
                .ok_or(ClientError::Http {
                    status: 404,
                    message: "Tag introuvable".to_string(),
                }),
            None => Ok(self.list(query)),
        }
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, ClientError> {
        self.record(format!("{method} {path}"));
        if method == Method::POST {
            let name = body
                .as_ref()
                .and_then(|body| body["name"].as_str())
                .unwrap_or("unnamed")
                .to_string();
            return Ok(Some(json!({ "data": self.push_tag(&name) })));
        }
        Ok(None)
    }
}

pub fn tag(id: u64) -> Value {
    json!({ "id": id, "name": format!("tag-{id}") })
}
