pub mod errors;
pub mod models;
pub mod providers;

pub use errors::{ProviderError, ProviderResult};
pub use models::content::{SystemContent, SystemPrompt};
pub use providers::base::{EventStream, Model, Usage};
pub use providers::configs::{ClientArgs, ConfigUpdate, ModelConfig, RoutingConfig};
pub use providers::events::{ContentDelta, StopReason, StreamEvent, ToolUseStart};
pub use providers::portkey::PortkeyModel;
