use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    /// Base64 encoded image data
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
/// Content passed to or from an LLM
pub enum Content {
    Text(TextContent),
    Image(ImageContent),
    Json { value: Value },
}

/// A block inside a structured system prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SystemContent {
    Text(TextContent),
    /// Marker for gateway-side prompt caching, carries no text
    CachePoint,
}

impl SystemContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        SystemContent::Text(TextContent { text: text.into() })
    }
}

/// System prompt provided ahead of the conversation, either a plain string
/// or content blocks for advanced features like prompt caching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SystemPrompt {
    Text(String),
    Blocks(Vec<SystemContent>),
}

impl SystemPrompt {
    pub fn text<S: Into<String>>(text: S) -> Self {
        SystemPrompt::Text(text.into())
    }

    pub fn blocks(blocks: Vec<SystemContent>) -> Self {
        SystemPrompt::Blocks(blocks)
    }

    /// The text sent as the system message. Blocks contribute their text
    /// values joined with single spaces; non-text blocks are skipped. None
    /// when nothing remains to send.
    pub fn as_message_text(&self) -> Option<String> {
        match self {
            SystemPrompt::Text(text) => {
                if text.is_empty() {
                    None
                } else {
                    Some(text.clone())
                }
            }
            SystemPrompt::Blocks(blocks) => {
                let texts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|block| match block {
                        SystemContent::Text(text) => Some(text.text.as_str()),
                        _ => None,
                    })
                    .collect();
                if texts.is_empty() {
                    None
                } else {
                    Some(texts.join(" "))
                }
            }
        }
    }
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(TextContent { text: text.into() })
    }

    pub fn image<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        Content::Image(ImageContent {
            data: data.into(),
            mime_type: mime_type.into(),
        })
    }

    pub fn json(value: Value) -> Self {
        Content::Json { value }
    }

    /// Get the text content if this is a TextContent variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(&text.text),
            _ => None,
        }
    }
}
