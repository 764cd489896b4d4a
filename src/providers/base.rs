use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::configs::{ConfigUpdate, ModelConfig};
use super::events::StreamEvent;
use crate::errors::ProviderError;
use crate::models::content::SystemPrompt;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolChoice};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// The finite sequence of normalized events produced by one streaming call
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderError>> + Send>>;

/// Base trait for model providers that stream responses to the agent
#[async_trait]
pub trait Model: Send + Sync {
    /// The current model configuration
    fn config(&self) -> &ModelConfig;

    /// Replace the model id and/or parameters without touching client arguments
    fn update_config(&mut self, update: ConfigUpdate) -> Result<(), ProviderError>;

    /// Stream one conversation turn as normalized events
    async fn stream(
        &self,
        system: Option<&SystemPrompt>,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<&ToolChoice>,
    ) -> Result<EventStream, ProviderError>;

    /// Request a response constrained to the given JSON schema
    async fn structured_output(
        &self,
        system: Option<&SystemPrompt>,
        messages: &[Message],
        schema: &Value,
    ) -> Result<Value, ProviderError>;
}
