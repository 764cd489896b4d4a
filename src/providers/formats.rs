use serde_json::{json, Value};

use super::configs::ModelConfig;
use crate::errors::ProviderError;
use crate::models::content::{Content, SystemPrompt};
use crate::models::message::{Message, MessageContent};
use crate::models::tool::{Tool, ToolChoice};

/// Convert a content block to the OpenAI-compatible wire shape
fn content_to_spec(content: &Content) -> Value {
    match content {
        Content::Text(text) => json!({"type": "text", "text": text.text}),
        Content::Image(image) => json!({
            "type": "image_url",
            "image_url": {
                "detail": "auto",
                "url": format!("data:{};base64,{}", image.mime_type, image.data),
            }
        }),
        Content::Json { value } => json!({"type": "text", "text": value.to_string()}),
    }
}

/// Convert internal messages to the OpenAI-compatible message array.
///
/// The system prompt becomes one leading role:"system" message; block-form
/// prompts have their text blocks joined with spaces. Tool requests become
/// tool_calls on the assistant message, and tool responses become separate
/// role:"tool" messages that follow it. Messages left with neither content
/// nor tool calls are dropped.
pub fn messages_to_request_spec(messages: &[Message], system: Option<&SystemPrompt>) -> Vec<Value> {
    let mut spec = Vec::new();

    if let Some(text) = system.and_then(SystemPrompt::as_message_text) {
        spec.push(json!({"role": "system", "content": text}));
    }

    for message in messages {
        let mut contents = Vec::new();
        let mut tool_calls = Vec::new();
        let mut tool_messages = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    contents.push(json!({"type": "text", "text": text.text}));
                }
                MessageContent::Image(image) => {
                    contents.push(content_to_spec(&Content::Image(image.clone())));
                }
                MessageContent::ToolRequest(request) => {
                    tool_calls.push(json!({
                        "id": request.id,
                        "type": "function",
                        "function": {
                            "name": request.call.name,
                            "arguments": request.call.arguments.to_string(),
                        }
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    let blocks: Vec<Value> =
                        response.content.iter().map(content_to_spec).collect();
                    // A tool message with nothing to say is dropped like any
                    // other empty message
                    if !blocks.is_empty() {
                        tool_messages.push(json!({
                            "role": "tool",
                            "tool_call_id": response.id,
                            "content": blocks,
                        }));
                    }
                }
            }
        }

        if !contents.is_empty() || !tool_calls.is_empty() {
            let mut converted = json!({
                "role": message.role,
                "content": contents,
            });
            if !tool_calls.is_empty() {
                converted["tool_calls"] = json!(tool_calls);
            }
            spec.push(converted);
        }
        spec.extend(tool_messages);
    }

    spec
}

/// Convert internal tools to the OpenAI-compatible function tool array
pub fn tools_to_request_spec(tools: &[Tool]) -> Result<Vec<Value>, ProviderError> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(ProviderError::InvalidRequest {
                message: format!("duplicate tool name: {}", tool.name),
                status: None,
            });
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Convert a tool choice strategy to the OpenAI-compatible tool_choice value
pub fn tool_choice_to_spec(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Any => json!("required"),
        ToolChoice::Tool { name } => {
            json!({"type": "function", "function": {"name": name}})
        }
    }
}

/// Assemble the outbound chat completions payload.
///
/// The config's params map is merged in last so callers can both add
/// parameters this crate does not know about and override base keys.
pub fn build_request(
    config: &ModelConfig,
    messages: &[Message],
    system: Option<&SystemPrompt>,
    tools: &[Tool],
    tool_choice: Option<&ToolChoice>,
    stream: bool,
) -> Result<Value, ProviderError> {
    let mut request = serde_json::Map::new();
    request.insert("model".to_string(), json!(config.model_id));
    request.insert(
        "messages".to_string(),
        json!(messages_to_request_spec(messages, system)),
    );

    if stream {
        request.insert("stream".to_string(), json!(true));
        request.insert("stream_options".to_string(), json!({"include_usage": true}));
    }

    // Some providers reject empty tools arrays, so the key is only present
    // when there are actual tool specs.
    if !tools.is_empty() {
        request.insert("tools".to_string(), json!(tools_to_request_spec(tools)?));
        if let Some(choice) = tool_choice {
            request.insert("tool_choice".to_string(), tool_choice_to_spec(choice));
        }
    }

    for (key, value) in &config.params {
        request.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::ToolCall;
    use serde_json::json;

    fn config() -> ModelConfig {
        ModelConfig::new("gpt-4o").unwrap()
    }

    #[test]
    fn test_messages_to_request_spec() {
        let message = Message::user().with_text("Hello");
        let spec = messages_to_request_spec(&[message], None);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"], json!([{"type": "text", "text": "Hello"}]));
    }

    #[test]
    fn test_system_prompt_first() {
        let message = Message::user().with_text("Hi");
        let system = SystemPrompt::text("You are helpful.");
        let spec = messages_to_request_spec(&[message], Some(&system));

        assert_eq!(spec.len(), 2);
        assert_eq!(spec[0]["role"], "system");
        assert_eq!(spec[0]["content"], "You are helpful.");
        assert_eq!(spec[1]["role"], "user");
    }

    #[test]
    fn test_empty_system_prompt_omitted() {
        let message = Message::user().with_text("Hi");
        let system = SystemPrompt::text("");
        let spec = messages_to_request_spec(&[message], Some(&system));
        assert_eq!(spec.len(), 1);
    }

    #[test]
    fn test_system_content_blocks_joined() {
        use crate::models::content::SystemContent;

        let message = Message::user().with_text("Hi");
        let system = SystemPrompt::blocks(vec![
            SystemContent::text("You are helpful."),
            SystemContent::CachePoint,
            SystemContent::text("Answer briefly."),
        ]);
        let spec = messages_to_request_spec(&[message], Some(&system));

        assert_eq!(spec.len(), 2);
        assert_eq!(spec[0]["role"], "system");
        assert_eq!(spec[0]["content"], "You are helpful. Answer briefly.");
    }

    #[test]
    fn test_system_content_blocks_without_text_omitted() {
        let message = Message::user().with_text("Hi");
        let system = SystemPrompt::blocks(vec![
            crate::models::content::SystemContent::CachePoint,
        ]);
        let spec = messages_to_request_spec(&[message], Some(&system));
        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
    }

    #[test]
    fn test_messages_to_request_spec_complex() {
        let messages = vec![
            Message::assistant().with_text("Hello!"),
            Message::user().with_text("How are you?"),
            Message::assistant().with_tool_request(
                "tool1",
                ToolCall::new("example", json!({"param1": "value1"})),
            ),
            Message::user().with_tool_response("tool1", vec![Content::text("Result")]),
        ];

        let spec = messages_to_request_spec(&messages, None);

        assert_eq!(spec.len(), 4);
        assert_eq!(spec[0]["role"], "assistant");
        assert_eq!(spec[1]["role"], "user");
        assert_eq!(spec[2]["role"], "assistant");
        assert!(spec[2]["tool_calls"].is_array());
        assert_eq!(
            spec[2]["tool_calls"][0]["function"]["arguments"],
            json!(r#"{"param1":"value1"}"#)
        );
        assert_eq!(spec[3]["role"], "tool");
        assert_eq!(spec[3]["tool_call_id"], "tool1");
        assert_eq!(
            spec[3]["content"],
            json!([{"type": "text", "text": "Result"}])
        );
    }

    #[test]
    fn test_json_tool_result_rendered_as_text() {
        let messages = vec![Message::user()
            .with_tool_response("t1", vec![Content::json(json!({"answer": 42}))])];
        let spec = messages_to_request_spec(&messages, None);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "tool");
        assert_eq!(spec[0]["content"][0]["text"], r#"{"answer":42}"#);
    }

    #[test]
    fn test_image_content_data_url() {
        let message = Message::user().with_image("aGVsbG8=", "image/png");
        let spec = messages_to_request_spec(&[message], None);

        assert_eq!(spec[0]["content"][0]["type"], "image_url");
        assert_eq!(
            spec[0]["content"][0]["image_url"]["url"],
            "data:image/png;base64,aGVsbG8="
        );
    }

    #[test]
    fn test_empty_messages_filtered() {
        let spec = messages_to_request_spec(&[Message::user()], None);
        assert!(spec.is_empty());
    }

    #[test]
    fn test_empty_tool_response_filtered() {
        let messages = vec![Message::user().with_tool_response("t1", vec![])];
        let spec = messages_to_request_spec(&messages, None);
        assert!(spec.is_empty());
    }

    #[test]
    fn test_tools_to_request_spec() -> anyhow::Result<()> {
        let tool = Tool::new(
            "test_tool",
            "A test tool",
            json!({
                "type": "object",
                "properties": {
                    "input": {"type": "string", "description": "Test parameter"}
                },
                "required": ["input"]
            }),
        );

        let spec = tools_to_request_spec(&[tool])?;

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "test_tool");
        Ok(())
    }

    #[test]
    fn test_tools_to_request_spec_duplicate() {
        let schema = json!({"type": "object", "properties": {}});
        let tool1 = Tool::new("test_tool", "Test tool", schema.clone());
        let tool2 = Tool::new("test_tool", "Test tool", schema);

        let result = tools_to_request_spec(&[tool1, tool2]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("duplicate tool name"));
    }

    #[test]
    fn test_tool_choice_to_spec() {
        assert_eq!(tool_choice_to_spec(&ToolChoice::Auto), json!("auto"));
        assert_eq!(tool_choice_to_spec(&ToolChoice::Any), json!("required"));
        assert_eq!(
            tool_choice_to_spec(&ToolChoice::Tool {
                name: "get_weather".to_string()
            }),
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
    }

    #[test]
    fn test_build_request_basic() -> anyhow::Result<()> {
        let messages = vec![Message::user().with_text("Hello")];
        let request = build_request(&config(), &messages, None, &[], None, true)?;

        assert_eq!(request["model"], "gpt-4o");
        assert_eq!(request["stream"], json!(true));
        assert_eq!(request["stream_options"]["include_usage"], json!(true));
        assert!(request.get("tools").is_none());
        Ok(())
    }

    #[test]
    fn test_build_request_merges_params() -> anyhow::Result<()> {
        let config = config()
            .with_param("temperature", json!(0.2))
            .with_param("max_tokens", json!(256));
        let messages = vec![Message::user().with_text("Hello")];
        let request = build_request(&config, &messages, None, &[], None, true)?;

        assert_eq!(request["temperature"], json!(0.2));
        assert_eq!(request["max_tokens"], json!(256));
        Ok(())
    }

    #[test]
    fn test_build_request_tool_choice_requires_tools() -> anyhow::Result<()> {
        let messages = vec![Message::user().with_text("Hello")];
        let request = build_request(
            &config(),
            &messages,
            None,
            &[],
            Some(&ToolChoice::Any),
            true,
        )?;
        assert!(request.get("tool_choice").is_none());

        let tool = Tool::new("t", "d", json!({"type": "object"}));
        let request = build_request(
            &config(),
            &messages,
            None,
            &[tool],
            Some(&ToolChoice::Any),
            true,
        )?;
        assert_eq!(request["tool_choice"], json!("required"));
        Ok(())
    }

    #[test]
    fn test_build_request_non_streaming() -> anyhow::Result<()> {
        let messages = vec![Message::user().with_text("Hello")];
        let request = build_request(&config(), &messages, None, &[], None, false)?;

        assert!(request.get("stream").is_none());
        assert!(request.get("stream_options").is_none());
        Ok(())
    }
}
