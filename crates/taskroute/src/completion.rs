//! Chat completion client.
//!
//! The router talks to the model through the [`CompletionApi`] trait so tests
//! (and alternative providers) can stand in for the network. [`ChatClient`]
//! is the production implementation for any OpenAI-compatible
//! `/chat/completions` endpoint.

use crate::config::CompletionSettings;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Boxed future returned by [`CompletionApi::complete`].
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// One single-turn completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model name sent to the API.
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A chat completion endpoint.
pub trait CompletionApi: Send + Sync {
    /// Send `request.prompt` as a single user message and return the text of
    /// the first choice. Every failure is reported as `CompletionApi`.
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}

// ── Wire types ─────────────────────────────────────────────────────

/// Role of a chat message. Tasks only ever send a single user turn.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Chat completion request body.
#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&CompletionRequest> for ChatRequest {
    fn from(req: &CompletionRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: vec![Message::user(&req.prompt)],
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        }
    }
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Extract the first choice's text from a response body.
fn parse_completion(text: &str) -> Result<String> {
    let parsed: RawChatResponse = serde_json::from_str(text)
        .map_err(|e| Error::CompletionApi(format!("failed to parse response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(Error::CompletionApi(format!("API error: {}", err.message)));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| Error::CompletionApi("empty completion response".into()))
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for an OpenAI-compatible chat completions API.
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ChatClient {
    /// Create a client for `{base_url}/chat/completions`.
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("taskroute/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    /// Build from settings, reading the API key from its environment variable.
    pub fn from_settings(settings: &CompletionSettings) -> Result<Self> {
        Self::new(
            &settings.base_url,
            settings.api_key()?,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<String> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::CompletionApi(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::CompletionApi(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(Error::CompletionApi(format!("HTTP {status}: {text}")));
        }

        parse_completion(&text)
    }
}

impl CompletionApi for ChatClient {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(async move { self.chat(&ChatRequest::from(request)).await })
    }
}
