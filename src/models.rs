//! These models represent the objects passed between the agent and the model.
//!
//! The wire format sent to the gateway is OpenAI-compatible JSON, and the
//! events coming back are the framework's normalized stream events. Both are
//! built from these internal structs with to/from helpers rather than being
//! used directly, so the internal models are not an exact match for either
//! side of the boundary.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
