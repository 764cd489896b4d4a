use std::collections::BTreeMap;

use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::base::{EventStream, Model};
use super::configs::{ClientArgs, ConfigUpdate, ModelConfig};
use super::events::{ContentDelta, StopReason, StreamEvent, ToolUseStart};
use super::formats;
use super::gateway::{ChunkStream, GatewayClient, ToolCallDelta};
use crate::errors::{map_gateway_error, ProviderError};
use crate::models::content::SystemPrompt;
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolChoice};

/// Model provider backed by the Portkey AI gateway.
///
/// The gateway provides unified access to the upstream providers with
/// fallbacks, load balancing, caching, and observability; this type only
/// translates between the framework's request/event shapes and the gateway's
/// OpenAI-compatible wire format.
pub struct PortkeyModel {
    config: ModelConfig,
    client: GatewayClient,
}

impl PortkeyModel {
    pub fn new(config: ModelConfig, client_args: ClientArgs) -> Result<Self, ProviderError> {
        debug!(model_id = %config.model_id, "initializing portkey model");
        let client = GatewayClient::new(client_args).map_err(map_gateway_error)?;
        Ok(Self { config, client })
    }

    /// Format a streaming chat request without sending it
    pub fn format_request(
        &self,
        system: Option<&SystemPrompt>,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<&ToolChoice>,
    ) -> Result<Value, ProviderError> {
        formats::build_request(&self.config, messages, system, tools, tool_choice, true)
    }

    /// Structured output deserialized into a caller type after schema validation
    pub async fn structured_output_as<T: DeserializeOwned>(
        &self,
        system: Option<&SystemPrompt>,
        messages: &[Message],
        schema: &Value,
    ) -> Result<T, ProviderError> {
        let value = self.structured_output(system, messages, schema).await?;
        serde_json::from_value(value).map_err(|e| ProviderError::SchemaValidation(e.to_string()))
    }
}

#[async_trait]
impl Model for PortkeyModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn update_config(&mut self, update: ConfigUpdate) -> Result<(), ProviderError> {
        self.config.apply(update)
    }

    async fn stream(
        &self,
        system: Option<&SystemPrompt>,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<&ToolChoice>,
    ) -> Result<EventStream, ProviderError> {
        debug!("formatting request");
        let request = self.format_request(system, messages, tools, tool_choice)?;

        debug!("invoking model through the gateway");
        let chunks = self
            .client
            .chat_completions_stream(&request)
            .await
            .map_err(map_gateway_error)?;

        Ok(Box::pin(normalize_stream(chunks)))
    }

    async fn structured_output(
        &self,
        system: Option<&SystemPrompt>,
        messages: &[Message],
        schema: &Value,
    ) -> Result<Value, ProviderError> {
        let mut request =
            formats::build_request(&self.config, messages, system, &[], None, false)?;
        request["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": "structured_output",
                "strict": true,
                "schema": schema,
            }
        });

        debug!("requesting structured output through the gateway");
        let response = self
            .client
            .chat_completions(&request)
            .await
            .map_err(map_gateway_error)?;

        if response.choices.len() > 1 {
            return Err(ProviderError::Other(anyhow::anyhow!(
                "multiple choices in structured output response"
            )));
        }
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::Other(anyhow::anyhow!("no choices in structured output response"))
        })?;
        let content = choice.message.content.ok_or_else(|| {
            ProviderError::Other(anyhow::anyhow!("structured output response had no content"))
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            ProviderError::SchemaValidation(format!("payload is not valid JSON: {e}"))
        })?;

        let compiled = jsonschema::JSONSchema::compile(schema)
            .map_err(|e| ProviderError::SchemaValidation(format!("invalid schema: {e}")))?;
        if let Err(errors) = compiled.validate(&value) {
            let detail = errors
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ProviderError::SchemaValidation(detail));
        }

        Ok(value)
    }
}

/// Convert the gateway's chunk stream into the framework's event sequence.
///
/// Text and reasoning deltas are emitted in arrival order under block index 0.
/// Tool-call fragments are buffered per originating call index and replayed as
/// one start/delta/stop run per call once the provider stream ends, so
/// fragments from concurrent tool calls are never merged. Tool blocks use
/// their call index offset past the text block. The sequence closes with a
/// message stop and, when the gateway reported usage, exactly one metadata
/// event.
fn normalize_stream(
    chunks: ChunkStream,
) -> impl Stream<Item = Result<StreamEvent, ProviderError>> {
    stream! {
        yield Ok(StreamEvent::MessageStart { role: Role::Assistant });
        yield Ok(StreamEvent::ContentBlockStart { index: 0, tool_use: None });

        let mut tool_calls: BTreeMap<usize, Vec<ToolCallDelta>> = BTreeMap::new();
        let mut stop_reason: Option<StopReason> = None;
        let mut usage = None;
        let mut chunks = chunks;

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(map_gateway_error(e));
                    return;
                }
            };

            if let Some(data) = chunk.usage {
                usage = Some(data);
            }
            let Some(choice) = chunk.choices.into_iter().next() else {
                continue;
            };

            if let Some(text) = choice.delta.content {
                if !text.is_empty() {
                    yield Ok(StreamEvent::ContentBlockDelta {
                        index: 0,
                        delta: ContentDelta::Text(text),
                    });
                }
            }
            if let Some(reasoning) = choice.delta.reasoning_content {
                if !reasoning.is_empty() {
                    yield Ok(StreamEvent::ContentBlockDelta {
                        index: 0,
                        delta: ContentDelta::Reasoning(reasoning),
                    });
                }
            }
            for fragment in choice.delta.tool_calls {
                tool_calls.entry(fragment.index).or_default().push(fragment);
            }
            if let Some(reason) = choice.finish_reason {
                stop_reason = Some(StopReason::from_finish_reason(&reason));
            }
        }

        yield Ok(StreamEvent::ContentBlockStop { index: 0 });

        for (call_index, fragments) in tool_calls {
            let block = call_index + 1;
            let first = &fragments[0];
            let Some(name) = first.function.name.clone() else {
                // One malformed call must not poison its siblings, so only
                // this call index yields an error item.
                yield Err(ProviderError::InvalidRequest {
                    message: format!(
                        "tool call {call_index} started without a function name"
                    ),
                    status: None,
                });
                continue;
            };
            let id = first.id.clone().unwrap_or_default();

            yield Ok(StreamEvent::ContentBlockStart {
                index: block,
                tool_use: Some(ToolUseStart { id, name }),
            });
            for fragment in &fragments {
                yield Ok(StreamEvent::ContentBlockDelta {
                    index: block,
                    delta: ContentDelta::ToolArguments(
                        fragment.function.arguments.clone().unwrap_or_default(),
                    ),
                });
            }
            yield Ok(StreamEvent::ContentBlockStop { index: block });
        }

        yield Ok(StreamEvent::MessageStop {
            stop_reason: stop_reason.unwrap_or(StopReason::EndTurn),
        });
        if let Some(data) = usage {
            yield Ok(StreamEvent::Metadata { usage: data.into() });
        }

        debug!("finished streaming response from model");
    }
}
