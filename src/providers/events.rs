use serde::{Deserialize, Serialize};

use super::base::Usage;
use crate::models::role::Role;

/// The start of a tool-use content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseStart {
    pub id: String,
    pub name: String,
}

/// Incremental payload inside a content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentDelta {
    Text(String),
    Reasoning(String),
    /// A fragment of the JSON arguments for a tool call
    ToolArguments(String),
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

impl StopReason {
    /// Map an OpenAI-compatible finish_reason onto the framework's stop
    /// reasons. Unrecognized reasons collapse to end-turn.
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "tool_calls" => StopReason::ToolUse,
            "length" => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        }
    }
}

/// One normalized event in a model response stream.
///
/// Content block events carry the index of the block they belong to: the text
/// block of a response is index 0, and each tool call keeps its own index so
/// fragments of concurrent tool calls are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    MessageStart {
        role: Role,
    },
    ContentBlockStart {
        index: usize,
        tool_use: Option<ToolUseStart>,
    },
    ContentBlockDelta {
        index: usize,
        delta: ContentDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageStop {
        stop_reason: StopReason,
    },
    Metadata {
        usage: Usage,
    },
}

impl StreamEvent {
    /// The text payload if this is a text delta
    pub fn as_text_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::ContentBlockDelta {
                delta: ContentDelta::Text(text),
                ..
            } => Some(text),
            _ => None,
        }
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self, StreamEvent::Metadata { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(
            StopReason::from_finish_reason("tool_calls"),
            StopReason::ToolUse
        );
        assert_eq!(
            StopReason::from_finish_reason("length"),
            StopReason::MaxTokens
        );
        assert_eq!(StopReason::from_finish_reason("stop"), StopReason::EndTurn);
        assert_eq!(
            StopReason::from_finish_reason("content_filter"),
            StopReason::EndTurn
        );
    }

    #[test]
    fn test_text_delta_accessor() {
        let event = StreamEvent::ContentBlockDelta {
            index: 0,
            delta: ContentDelta::Text("hi".to_string()),
        };
        assert_eq!(event.as_text_delta(), Some("hi"));

        let event = StreamEvent::ContentBlockDelta {
            index: 1,
            delta: ContentDelta::ToolArguments("{".to_string()),
        };
        assert_eq!(event.as_text_delta(), None);
    }
}
