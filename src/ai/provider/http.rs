//! OpenAI-Compatible HTTP Backend
//!
//! Chat-completions endpoint (`POST {base}/chat/completions`) with
//! bearer auth; the flat prompt is wrapped in a single user message.
//! Provider-delivered error statuses come back as
//! [`ProviderReply::Failure`] so the dispatcher can classify them; only
//! transport problems (connect, timeout, decode) surface as `Err`.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{CompletionBackend, CompletionRequest, ProviderReply};
use crate::types::{QuizError, Result};
use async_trait::async_trait;

/// Maximum characters of a raw error body kept for diagnostics
const ERROR_SNIPPET_CHARS: usize = 300;

pub struct HttpBackend {
    client: Client,
    endpoint: Url,
    api_key: SecretString,
}

impl HttpBackend {
    pub fn new(api_base: &str, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let endpoint = chat_completions_url(api_base)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<ProviderReply> {
        let body = ChatCompletionBody::from_request(request);
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: ChatCompletionResponse = response.json().await?;
            let Some(choice) = body.choices.into_iter().next() else {
                return Ok(ProviderReply::Failure {
                    status: status.as_u16(),
                    code: "empty_response".to_string(),
                    message: "provider returned no completion choices".to_string(),
                });
            };
            return Ok(ProviderReply::Success {
                text: choice.message.content,
                total_tokens: body.usage.and_then(|u| u.total_tokens),
            });
        }

        let raw = response.text().await.unwrap_or_default();
        let (code, message) = parse_error_body(&raw);
        Ok(ProviderReply::Failure {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "slice_is_empty")]
    stop: &'a [String],
}

fn slice_is_empty(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatCompletionBody<'a> {
    fn from_request(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop: &request.stop,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsageBody>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct UsageBody {
    #[serde(default)]
    total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

fn chat_completions_url(api_base: &str) -> Result<Url> {
    let joined = format!("{}/chat/completions", api_base.trim_end_matches('/'));
    Url::parse(&joined)
        .map_err(|e| QuizError::config(format!("invalid api_base '{api_base}': {e}")))
}

/// Pull `(code, message)` out of a provider error body.
///
/// Providers that follow the OpenAI envelope nest both under `error`;
/// anything else falls back to a truncated raw snippet.
fn parse_error_body(raw: &str) -> (String, String) {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        let code = match envelope.error.code {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        };
        let message = envelope
            .error
            .message
            .unwrap_or_else(|| "no error message".to_string());
        return (code, message);
    }
    let snippet: String = raw.chars().take(ERROR_SNIPPET_CHARS).collect();
    ("http_error".to_string(), snippet)
}

// =============================================================================
// Tests
// =============================================================================
