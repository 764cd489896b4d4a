use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::errors::ProviderError;

/// Default Portkey gateway endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.portkey.ai/v1";

/// Model id plus free-form inference parameters forwarded to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model id, e.g. "gpt-4o" or "claude-sonnet-4-6"
    pub model_id: String,
    /// Extra model parameters merged into the request, e.g. temperature or max_tokens
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl ModelConfig {
    pub fn new<S: Into<String>>(model_id: S) -> Result<Self, ProviderError> {
        let model_id = model_id.into();
        validate_model_id(&model_id)?;
        Ok(Self {
            model_id,
            params: Map::new(),
        })
    }

    pub fn with_param<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Apply a partial update, replacing only the fields the update names
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), ProviderError> {
        if let Some(model_id) = update.model_id {
            validate_model_id(&model_id)?;
            self.model_id = model_id;
        }
        if let Some(params) = update.params {
            self.params = params;
        }
        Ok(())
    }
}

fn validate_model_id(model_id: &str) -> Result<(), ProviderError> {
    if model_id.trim().is_empty() {
        return Err(ProviderError::Config(
            "model_id must not be empty or whitespace".to_string(),
        ));
    }
    Ok(())
}

/// Partial override of the model configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub model_id: Option<String>,
    pub params: Option<Map<String, Value>>,
}

impl ConfigUpdate {
    pub fn model_id<S: Into<String>>(mut self, model_id: S) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }
}

/// Routing configuration for the gateway. The document is opaque to this
/// crate: fallback/load-balance strategies, targets, and cache settings are
/// interpreted by the gateway alone and forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutingConfig {
    /// A saved config id, e.g. "pc-xxxx"
    Id(String),
    /// An inline config document
    Inline(Value),
}

impl RoutingConfig {
    /// The value sent in the x-portkey-config header
    pub fn header_value(&self) -> Result<String, serde_json::Error> {
        match self {
            RoutingConfig::Id(id) => Ok(id.clone()),
            RoutingConfig::Inline(doc) => serde_json::to_string(doc),
        }
    }
}

/// Arguments for the gateway client. Everything here is routing and auth
/// context owned by the gateway; none of it participates in request shaping.
#[derive(Debug, Clone, Default)]
pub struct ClientArgs {
    /// Gateway endpoint, defaults to the hosted Portkey API
    pub base_url: Option<String>,
    /// Portkey API key
    pub api_key: Option<String>,
    /// Virtual key aliasing a provider credential held by the gateway
    pub virtual_key: Option<String>,
    /// Provider slug, e.g. "openai" or "anthropic"
    pub provider: Option<String>,
    /// Routing config id or inline document
    pub config: Option<RoutingConfig>,
    /// Trace id for request correlation
    pub trace_id: Option<String>,
    /// Observability metadata attached to the call
    pub metadata: Option<Map<String, Value>>,
    /// Direct provider credential, used together with a provider slug
    pub authorization: Option<String>,
    /// Additional headers passed through untouched, for gateway features
    /// this crate does not know about
    pub extra_headers: HashMap<String, String>,
}

impl ClientArgs {
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn virtual_key<S: Into<String>>(mut self, virtual_key: S) -> Self {
        self.virtual_key = Some(virtual_key.into());
        self
    }

    pub fn provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn config(mut self, config: RoutingConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn trace_id<S: Into<String>>(mut self, trace_id: S) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn authorization<S: Into<String>>(mut self, authorization: S) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    pub fn extra_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
