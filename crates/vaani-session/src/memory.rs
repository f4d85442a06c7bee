//! Long-term memory store collaborator boundary
//!
//! The registry persists a one-line session summary here when a session
//! ends. The store is remote and has its own concurrency guarantees; this
//! module only owns the client-side contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: String,
    pub content: String,
}

impl StoredMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("memory store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("memory store returned status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("memory store response missing record id")]
    MissingId,
}

/// External conversation-memory store. Returns the id of the stored record.
#[async_trait]
pub trait LongTermMemoryStore: Send + Sync {
    async fn store_conversation(
        &self,
        user_id: &str,
        messages: &[StoredMessage],
        metadata: serde_json::Value,
    ) -> Result<String, MemoryStoreError>;
}

#[derive(Serialize)]
struct StoreRequest<'a> {
    user_id: &'a str,
    messages: &'a [StoredMessage],
    metadata: serde_json::Value,
}

#[derive(Deserialize)]
struct StoreResponse {
    #[serde(default)]
    id: Option<String>,
}

/// HTTP-backed memory store client.
#[derive(Clone)]
pub struct HttpMemoryStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpMemoryStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl LongTermMemoryStore for HttpMemoryStore {
    async fn store_conversation(
        &self,
        user_id: &str,
        messages: &[StoredMessage],
        metadata: serde_json::Value,
    ) -> Result<String, MemoryStoreError> {
        let endpoint = format!("{}/memories", self.base_url.trim_end_matches('/'));
        let request = StoreRequest {
            user_id,
            messages,
            metadata,
        };

        let mut builder = self.client.post(&endpoint).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryStoreError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let parsed: StoreResponse = response.json().await?;
        parsed.id.ok_or(MemoryStoreError::MissingId)
    }
}

/// Stand-in used when no memory backend is configured. Accepts every write
/// and hands back a fresh id.
#[derive(Debug, Default, Clone)]
pub struct NoopMemoryStore;

#[async_trait]
impl LongTermMemoryStore for NoopMemoryStore {
    async fn store_conversation(
        &self,
        user_id: &str,
        messages: &[StoredMessage],
        _metadata: serde_json::Value,
    ) -> Result<String, MemoryStoreError> {
        debug!(user_id, count = messages.len(), "memory store disabled, dropping conversation");
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn store_conversation_posts_payload_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/memories"))
            .and(header("authorization", "Bearer key-1"))
            .and(body_partial_json(serde_json::json!({
                "user_id": "u1",
                "metadata": { "category": "session_summary" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "mem-42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpMemoryStore::new(server.uri(), "key-1");
        let id = store
            .store_conversation(
                "u1",
                &[StoredMessage::new("system", "summary text")],
                serde_json::json!({ "category": "session_summary" }),
            )
            .await
            .unwrap();
        assert_eq!(id, "mem-42");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/memories"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let store = HttpMemoryStore::new(server.uri(), "");
        let err = store
            .store_conversation("u1", &[], serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            MemoryStoreError::Status { code, body } => {
                assert_eq!(code, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_id_in_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/memories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let store = HttpMemoryStore::new(server.uri(), "");
        let err = store
            .store_conversation("u1", &[], serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryStoreError::MissingId));
    }

    #[tokio::test]
    async fn noop_store_accepts_writes() {
        let store = NoopMemoryStore;
        let id = store
            .store_conversation("u1", &[], serde_json::json!({}))
            .await
            .unwrap();
        assert!(!id.is_empty());
    }
}
