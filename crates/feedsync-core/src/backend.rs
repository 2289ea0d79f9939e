//! Request/response interface to the feed backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{FeedError, FeedResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Fetch,
    Create,
    Update,
    Delete,
}

/// One backend call: verb, path relative to the API base, optional query
/// and body, and the caller's auth token.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub verb: Verb,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub token: String,
}

impl ApiRequest {
    fn new(verb: Verb, path: impl Into<String>, token: &str) -> Self {
        Self {
            verb,
            path: path.into(),
            query: Vec::new(),
            body: None,
            token: token.to_string(),
        }
    }

    pub fn fetch(path: impl Into<String>, token: &str) -> Self {
        Self::new(Verb::Fetch, path, token)
    }

    pub fn create(path: impl Into<String>, body: Value, token: &str) -> Self {
        Self::new(Verb::Create, path, token).with_body(body)
    }

    pub fn update(path: impl Into<String>, token: &str) -> Self {
        Self::new(Verb::Update, path, token)
    }

    pub fn delete(path: impl Into<String>, token: &str) -> Self {
        Self::new(Verb::Delete, path, token)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the decoded success body, or the rejection converted to a `FeedError`.
    async fn send(&self, request: ApiRequest) -> FeedResult<Value>;
}

/// Build the rejection for a failed call, pulling `msg` out of the body.
pub fn rejection(status: Option<u16>, body: &str) -> FeedError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(String::from));
    FeedError::RemoteRejected { status, message }
}

/// HTTP implementation of `Backend`.
pub struct RestBackend {
    api_base: String,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn send(&self, request: ApiRequest) -> FeedResult<Value> {
        let url = self.url(&request.path);
        let builder = match request.verb {
            Verb::Fetch => self.client.get(&url),
            Verb::Create => self.client.post(&url),
            Verb::Update => self.client.patch(&url),
            Verb::Delete => self.client.delete(&url),
        };

        let mut builder = builder
            .header("Authorization", &request.token)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FeedError::Disconnected(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FeedError::Disconnected(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection(Some(status.as_u16()), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| FeedError::InvalidResponse(e.to_string()))
    }
}
