use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::base::Usage;
use super::configs::{ClientArgs, DEFAULT_BASE_URL};

/// Error messages that indicate context window overflow regardless of status
const CONTEXT_WINDOW_OVERFLOW_MESSAGES: &[&str] = &[
    "prompt is too long",
    "input is too long",
    "maximum context length",
    "context window",
    "context length exceeded",
    "too many tokens",
];

/// Typed errors raised by the gateway client
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("context length exceeded: {message}")]
    ContextLengthExceeded {
        message: String,
        status: Option<u16>,
    },

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        status: Option<u16>,
    },

    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        message: String,
        status: Option<u16>,
    },

    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        status: Option<u16>,
    },

    #[error("gateway error (status {status:?}): {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("malformed stream event: {0}")]
    Decode(String),
}

/// One streamed chunk of an OpenAI-compatible chat completion
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<UsageData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallDelta>,
}

/// A fragment of a tool invocation, tagged with its call index
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallDelta {
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: FunctionDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsageData {
    #[serde(default)]
    pub prompt_tokens: Option<i32>,
    #[serde(default)]
    pub completion_tokens: Option<i32>,
    #[serde(default)]
    pub total_tokens: Option<i32>,
}

impl From<UsageData> for Usage {
    fn from(data: UsageData) -> Self {
        let total = data
            .total_tokens
            .or(match (data.prompt_tokens, data.completion_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });
        Usage::new(data.prompt_tokens, data.completion_tokens, total)
    }
}

/// A non-streaming chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
    #[serde(default)]
    pub usage: Option<UsageData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseChoice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, GatewayError>> + Send>>;

/// HTTP client for the Portkey gateway's OpenAI-compatible chat completions
/// surface. Routing, fallback, caching, and guardrails all happen on the
/// gateway side; this client only attaches the routing/auth headers and
/// decodes the response.
pub struct GatewayClient {
    client: reqwest::Client,
    args: ClientArgs,
}

impl GatewayClient {
    pub fn new(args: ClientArgs) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().build()?;
        // Fail on bad header material at construction rather than first call
        build_headers(&args)?;
        Ok(Self { client, args })
    }

    pub fn args(&self) -> &ClientArgs {
        &self.args
    }

    fn url(&self) -> String {
        let base = self
            .args
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    async fn post(&self, request: &Value) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .client
            .post(self.url())
            .headers(build_headers(&self.args)?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }

    /// Issue a streaming chat completion and decode the SSE response
    pub async fn chat_completions_stream(
        &self,
        request: &Value,
    ) -> Result<ChunkStream, GatewayError> {
        let response = self.post(request).await?;

        let chunks = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) => {
                        if event.data.trim() == "[DONE]" {
                            None
                        } else {
                            Some(serde_json::from_str::<ChatChunk>(&event.data).map_err(|e| {
                                GatewayError::Decode(format!("{e}: {}", event.data))
                            }))
                        }
                    }
                    Err(e) => Some(Err(GatewayError::Decode(e.to_string()))),
                }
            });

        Ok(Box::pin(chunks))
    }

    /// Issue a non-streaming chat completion
    pub async fn chat_completions(&self, request: &Value) -> Result<ChatResponse, GatewayError> {
        let response = self.post(request).await?;
        Ok(response.json::<ChatResponse>().await?)
    }
}

/// Build the x-portkey-* header set from the client arguments. Unknown extra
/// headers are forwarded untouched.
fn build_headers(args: &ClientArgs) -> Result<HeaderMap, GatewayError> {
    let mut headers = HeaderMap::new();

    let mut insert = |name: &'static str, value: String| -> Result<(), GatewayError> {
        let value = HeaderValue::from_str(&value).map_err(|e| GatewayError::InvalidRequest {
            message: format!("invalid value for header {name}: {e}"),
            status: None,
        })?;
        headers.insert(name, value);
        Ok(())
    };

    if let Some(api_key) = &args.api_key {
        insert("x-portkey-api-key", api_key.clone())?;
    }
    if let Some(virtual_key) = &args.virtual_key {
        insert("x-portkey-virtual-key", virtual_key.clone())?;
    }
    if let Some(provider) = &args.provider {
        insert("x-portkey-provider", provider.clone())?;
    }
    if let Some(config) = &args.config {
        let value = config
            .header_value()
            .map_err(|e| GatewayError::InvalidRequest {
                message: format!("routing config is not serializable: {e}"),
                status: None,
            })?;
        insert("x-portkey-config", value)?;
    }
    if let Some(trace_id) = &args.trace_id {
        insert("x-portkey-trace-id", trace_id.clone())?;
    }
    if let Some(metadata) = &args.metadata {
        let value =
            serde_json::to_string(metadata).map_err(|e| GatewayError::InvalidRequest {
                message: format!("metadata is not serializable: {e}"),
                status: None,
            })?;
        insert("x-portkey-metadata", value)?;
    }
    if let Some(authorization) = &args.authorization {
        insert("authorization", authorization.clone())?;
    }

    for (key, value) in &args.extra_headers {
        let name =
            HeaderName::from_bytes(key.as_bytes()).map_err(|e| GatewayError::InvalidRequest {
                message: format!("invalid extra header name {key}: {e}"),
                status: None,
            })?;
        let value = HeaderValue::from_str(value).map_err(|e| GatewayError::InvalidRequest {
            message: format!("invalid value for extra header {key}: {e}"),
            status: None,
        })?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Classify a non-success response into a typed gateway error.
///
/// Context overflow is checked before the status dispatch because providers
/// report it under several different 4xx statuses.
fn classify_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string());
    let lowered = message.to_lowercase();
    let status_code = Some(status.as_u16());

    if status == StatusCode::PAYLOAD_TOO_LARGE
        || CONTEXT_WINDOW_OVERFLOW_MESSAGES
            .iter()
            .any(|pattern| lowered.contains(pattern))
    {
        return GatewayError::ContextLengthExceeded {
            message,
            status: status_code,
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || status.as_u16() == 529
        || lowered.contains("rate")
        || lowered.contains("overloaded")
    {
        return GatewayError::RateLimited {
            message,
            status: status_code,
        };
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::AuthenticationFailed {
            message,
            status: status_code,
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::InvalidRequest {
                message,
                status: status_code,
            }
        }
        _ => GatewayError::Api {
            message,
            status: status_code,
        },
    }
}
