use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::errors::{AgentError, AgentResult};
use crate::stream::{decode_frame, SseDecoder, StreamEvent};

/// Server-side thread record as returned by create and search.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteThread {
    pub thread_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Opaque graph state; `values.messages` holds the history when present.
    #[serde(default)]
    pub values: Value,
}

/// Durable state snapshot for one thread.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadState {
    #[serde(default)]
    pub values: Value,
}

/// The seam between the send operation and the remote runtime, so the send
/// path can be exercised against canned events and state.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Start a run for one user message and stream its events.
    async fn stream_run(
        &self,
        thread_id: &str,
        message: &str,
    ) -> AgentResult<BoxStream<'static, AgentResult<StreamEvent>>>;

    /// Fetch the thread's last durably persisted state.
    async fn thread_state(&self, thread_id: &str) -> AgentResult<ThreadState>;
}

/// HTTP client for a LangGraph agent runtime.
pub struct AgentClient {
    client: reqwest::Client,
    config: RuntimeConfig,
}

impl AgentClient {
    pub fn new(config: RuntimeConfig) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()
            .map_err(AgentError::from)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);
        let mut builder = self.client.request(method, url);
        if let Some(key) = self.config.effective_api_key() {
            builder = builder.header("x-api-key", key);
        }
        builder
    }

    async fn expect_ok(response: Response) -> AgentResult<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(AgentError::service(status.as_u16(), message))
        }
    }

    /// True when the service is reachable and has at least one registered
    /// assistant. Failures degrade to `false`; startup proceeds without
    /// server history either way.
    pub async fn health_check(&self) -> bool {
        match self.search_assistants().await {
            Ok(assistants) => !assistants.is_empty(),
            Err(err) => {
                tracing::warn!("health check failed: {err}");
                false
            }
        }
    }

    async fn search_assistants(&self) -> AgentResult<Vec<Value>> {
        let response = self
            .request(Method::POST, "/assistants/search")
            .json(&json!({ "limit": 10, "offset": 0 }))
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        response.json().await.map_err(AgentError::from)
    }

    pub async fn create_thread(&self) -> AgentResult<RemoteThread> {
        let response = self
            .request(Method::POST, "/threads")
            .json(&json!({}))
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        response.json().await.map_err(AgentError::from)
    }

    /// Existing threads for the configured assistant. The metadata key
    /// depends on whether the identifier is a UUID (assistant) or a plain
    /// graph name.
    pub async fn search_threads(&self) -> AgentResult<Vec<RemoteThread>> {
        let assistant_id = &self.config.assistant_id;
        let metadata = if Uuid::parse_str(assistant_id).is_ok() {
            json!({ "assistant_id": assistant_id })
        } else {
            json!({ "graph_id": assistant_id })
        };

        let response = self
            .request(Method::POST, "/threads/search")
            .json(&json!({ "metadata": metadata, "limit": 100 }))
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        response.json().await.map_err(AgentError::from)
    }

    pub async fn get_thread_state(&self, thread_id: &str) -> AgentResult<ThreadState> {
        let response = self
            .request(Method::GET, &format!("/threads/{thread_id}/state"))
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;
        response.json().await.map_err(AgentError::from)
    }

    /// Start a run for one user message and decode its SSE body into stream
    /// events. Frames the reducer cannot consume are dropped silently.
    pub async fn stream_run(
        &self,
        thread_id: &str,
        message: &str,
    ) -> AgentResult<BoxStream<'static, AgentResult<StreamEvent>>> {
        let body = json!({
            "assistant_id": self.config.assistant_id,
            "input": {
                "messages": [{ "role": "user", "content": message }]
            },
            "stream_mode": ["updates", "values", "messages"],
        });

        let response = self
            .request(Method::POST, &format!("/threads/{thread_id}/runs/stream"))
            .json(&body)
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;

        let mut bytes = response.bytes_stream();
        Ok(Box::pin(async_stream::try_stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(AgentError::from)?;
                decoder.push(&chunk);
                while let Some(frame) = decoder.next_frame() {
                    if let Some(event) = decode_frame(&frame) {
                        yield event;
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl Runtime for AgentClient {
    async fn stream_run(
        &self,
        thread_id: &str,
        message: &str,
    ) -> AgentResult<BoxStream<'static, AgentResult<StreamEvent>>> {
        AgentClient::stream_run(self, thread_id, message).await
    }

    async fn thread_state(&self, thread_id: &str) -> AgentResult<ThreadState> {
        self.get_thread_state(thread_id).await
    }
}
