//! Chat-completion client used by the summarization pipeline.
//!
//! The Ollama adapter issues a single non-streaming `POST /api/chat` per request and
//! decodes the reply into a typed structure, so a missing `message.content` field is
//! reported as [`ChatClientError::InvalidResponse`] rather than surfacing later as an
//! empty summary.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while talking to the chat-completion service.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// Service could not be reached or the endpoint does not exist.
    #[error("Chat provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Service answered with a non-success status.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Service answered, but the body lacked required fields or was not JSON.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// No answer arrived within the configured bound.
    #[error("Chat provider timed out after {0:?}")]
    Timeout(Duration),
}

/// Single-message chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Content of the lone `user` message.
    pub prompt: String,
}

/// Validated chat reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// Model that produced the reply, as reported by the provider.
    pub model: String,
    /// Generated assistant text.
    pub content: String,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `request` and wait for the full reply.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatClientError>;
}

/// Build the Ollama-backed chat client described by `config`.
pub fn get_chat_client(config: &Config) -> Result<OllamaChatClient, ChatClientError> {
    OllamaChatClient::new(config.ollama_url.clone(), config.summarization_timeout())
}

/// Chat client for a local Ollama runtime.
pub struct OllamaChatClient {
    http: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl OllamaChatClient {
    /// Create a client for `base_url`. `timeout` bounds each request when set.
    pub fn new(base_url: String, timeout: Option<Duration>) -> Result<Self, ChatClientError> {
        let mut builder = Client::builder().user_agent("docsum/summary");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|error| {
            ChatClientError::ProviderUnavailable(format!("failed to build HTTP client: {error}"))
        })?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    fn map_transport_error(&self, error: reqwest::Error) -> ChatClientError {
        match self.timeout {
            Some(timeout) if error.is_timeout() => ChatClientError::Timeout(timeout),
            _ => ChatClientError::ProviderUnavailable(format!(
                "failed to reach Ollama at {}: {error}",
                self.base_url
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatPayload<'a> {
    model: &'a str,
    messages: [OllamaMessage<'a>; 1],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatReply {
    #[serde(default)]
    model: Option<String>,
    message: OllamaReplyMessage,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaReplyMessage {
    content: String,
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatClientError> {
        let payload = OllamaChatPayload {
            model: &request.model,
            messages: [OllamaMessage {
                role: "user",
                content: &request.prompt,
            }],
            stream: false,
        };

        tracing::debug!(
            endpoint = %self.endpoint(),
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Sending chat request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| self.map_transport_error(error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ChatClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| self.map_transport_error(error))?;
        let reply: OllamaChatReply = serde_json::from_slice(&body).map_err(|error| {
            ChatClientError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !reply.done {
            return Err(ChatClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(ChatResponse {
            model: reply.model.unwrap_or(request.model),
            content: reply.message.content,
        })
    }
}
