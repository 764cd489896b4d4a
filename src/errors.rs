use thiserror::Error;

use crate::providers::gateway::GatewayError;

/// The error taxonomy the agent framework sees, regardless of backend.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("context window overflow: {message}")]
    ContextWindowOverflow {
        message: String,
        status: Option<u16>,
    },

    #[error("model throttled: {message}")]
    Throttled {
        message: String,
        status: Option<u16>,
    },

    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        status: Option<u16>,
    },

    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        status: Option<u16>,
    },

    #[error("structured output does not satisfy the schema: {0}")]
    SchemaValidation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    /// The HTTP status carried over from the gateway, when one exists
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ContextWindowOverflow { status, .. }
            | ProviderError::Throttled { status, .. }
            | ProviderError::Authentication { status, .. }
            | ProviderError::InvalidRequest { status, .. } => *status,
            _ => None,
        }
    }
}

/// Map a gateway error onto the framework taxonomy, preserving the original
/// message and status. Unrecognized kinds pass through unchanged.
pub fn map_gateway_error(error: GatewayError) -> ProviderError {
    match error {
        GatewayError::ContextLengthExceeded { message, status } => {
            ProviderError::ContextWindowOverflow { message, status }
        }
        GatewayError::RateLimited { message, status } => {
            ProviderError::Throttled { message, status }
        }
        GatewayError::AuthenticationFailed { message, status } => {
            ProviderError::Authentication { message, status }
        }
        GatewayError::InvalidRequest { message, status } => {
            ProviderError::InvalidRequest { message, status }
        }
        other => ProviderError::Other(anyhow::Error::new(other)),
    }
}
