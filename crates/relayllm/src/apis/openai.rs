//! Canonical OpenAI-shaped wire types shared by every adaptor.
//!
//! Request types keep unknown client fields in a flattened `extra` map so that
//! a relayed body loses nothing the gateway does not understand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StreamOptions {
    #[serde(default)]
    pub include_usage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
    /// Anything else a provider puts in `content`; contributes no text.
    Other(Value),
}

impl MessageContent {
    /// Concatenated text of the content, ignoring non-text parts.
    pub fn string_content(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|part| part.part_type == "text")
                .filter_map(|part| part.text.as_deref())
                .collect(),
            MessageContent::Other(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Message {
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn string_content(&self) -> String {
        self.content
            .as_ref()
            .map(MessageContent::string_content)
            .unwrap_or_default()
    }
}

/// The gateway's canonical chat/completions request.
///
/// `max_tokens` is the legacy limit; `Some(0)` is treated the same as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatCompletionsRequest {
    pub model: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionsRequest {
    /// The legacy limit, if it carries a usable (non-zero) value.
    pub fn legacy_max_tokens(&self) -> Option<u32> {
        self.max_tokens.filter(|v| *v != 0)
    }

    /// Explicit copy of every present field into an ordered field map.
    pub fn to_field_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("model".to_string(), Value::from(self.model.clone()));
        if !self.messages.is_empty() {
            map.insert("messages".to_string(), json_value(&self.messages));
        }
        insert_opt(&mut map, "prompt", self.prompt.clone());
        insert_opt(&mut map, "max_tokens", self.max_tokens.map(Value::from));
        insert_opt(
            &mut map,
            "max_completion_tokens",
            self.max_completion_tokens.map(Value::from),
        );
        insert_opt(
            &mut map,
            "reasoning_effort",
            self.reasoning_effort.clone().map(Value::from),
        );
        if self.stream {
            map.insert("stream".to_string(), Value::Bool(true));
        }
        insert_opt(
            &mut map,
            "stream_options",
            self.stream_options.as_ref().map(json_value),
        );
        insert_opt(&mut map, "temperature", self.temperature.map(Value::from));
        insert_opt(&mut map, "top_p", self.top_p.map(Value::from));
        insert_opt(&mut map, "n", self.n.map(Value::from));
        insert_opt(&mut map, "stop", self.stop.clone());
        insert_opt(
            &mut map,
            "presence_penalty",
            self.presence_penalty.map(Value::from),
        );
        insert_opt(
            &mut map,
            "frequency_penalty",
            self.frequency_penalty.map(Value::from),
        );
        insert_opt(&mut map, "tools", self.tools.clone());
        insert_opt(&mut map, "tool_choice", self.tool_choice.clone());
        insert_opt(&mut map, "response_format", self.response_format.clone());
        insert_opt(&mut map, "seed", self.seed.map(Value::from));
        insert_opt(&mut map, "user", self.user.clone().map(Value::from));
        for (key, value) in &self.extra {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl TryFrom<&[u8]> for ChatCompletionsRequest {
    type Error = serde_json::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

// Serializing these plain data types cannot fail; Null is unreachable.
fn json_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ImageRequest {
    #[serde(default)]
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// RESPONSES
// ============================================================================

/// Providers send `null` for fields they leave unset; read it as the zero value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Usage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt_tokens: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completion_tokens: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tokens: usize,
}

impl Usage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Provider-side error object, carried verbatim back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OpenAIError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
}

impl std::fmt::Display for OpenAIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.error_type)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct TextResponseChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Only the parts of a non-stream response envelope the gateway inspects.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct TextResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<TextResponseChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub error: Option<OpenAIError>,
}

impl TextResponse {
    /// The provider error, if the envelope carries one with a non-empty type.
    pub fn provider_error(&self) -> Option<&OpenAIError> {
        self.error.as_ref().filter(|e| !e.error_type.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<MessageContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ChatCompletionsStreamChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: StreamDelta,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ChatCompletionsStreamResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<ChatCompletionsStreamChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletionsStreamResponse {
    /// Chunks with no choices and no usage are provider heartbeats.
    pub fn is_empty_heartbeat(&self) -> bool {
        self.choices.is_empty() && self.usage.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct CompletionsStreamChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct CompletionsStreamResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<CompletionsStreamChoice>,
}

/// `response.output_text.delta` payload of the Responses API.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ResponsesOutputDelta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_keeps_unknown_fields() {
        let body = json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 16,
            "logit_bias": {"50256": -100}
        });
        let request = ChatCompletionsRequest::try_from(body.to_string().as_bytes()).unwrap();
        assert_eq!(request.max_tokens, Some(16));
        assert_eq!(request.extra.get("logit_bias"), Some(&json!({"50256": -100})));

        let reserialized: Value = serde_json::from_slice(&request.to_bytes().unwrap()).unwrap();
        assert_eq!(reserialized, body);
    }

    #[test]
    fn test_field_map_preserves_declaration_order() {
        let request = ChatCompletionsRequest {
            model: "o3".to_string(),
            max_tokens: Some(10),
            temperature: Some(1.0),
            user: Some("u-1".to_string()),
            ..Default::default()
        };
        let keys: Vec<_> = request.to_field_map().keys().cloned().collect();
        assert_eq!(keys, vec!["model", "max_tokens", "temperature", "user"]);
    }

    #[test]
    fn test_string_content_of_parts() {
        let content: MessageContent = serde_json::from_value(json!([
            {"type": "text", "text": "hello "},
            {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}},
            {"type": "text", "text": "world"}
        ]))
        .unwrap();
        assert_eq!(content.string_content(), "hello world");
    }

    #[test]
    fn test_text_response_provider_error() {
        let ok: TextResponse = serde_json::from_value(json!({
            "choices": [],
            "error": {"message": "", "type": ""}
        }))
        .unwrap();
        assert!(ok.provider_error().is_none());

        let failed: TextResponse = serde_json::from_value(json!({
            "error": {"message": "quota", "type": "insufficient_quota", "code": "insufficient_quota"}
        }))
        .unwrap();
        assert_eq!(failed.provider_error().unwrap().error_type, "insufficient_quota");
    }

    #[test]
    fn test_stream_heartbeat_detection() {
        let heartbeat: ChatCompletionsStreamResponse =
            serde_json::from_str(r#"{"choices":[],"usage":null}"#).unwrap();
        assert!(heartbeat.is_empty_heartbeat());

        let usage_only: ChatCompletionsStreamResponse = serde_json::from_str(
            r#"{"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":4,"total_tokens":7}}"#,
        )
        .unwrap();
        assert!(!usage_only.is_empty_heartbeat());
    }

    #[test]
    fn test_null_fields_read_as_zero_values() {
        let response: TextResponse = serde_json::from_value(json!({
            "choices": [{"index": null, "message": {"role": null, "content": "ok"}, "finish_reason": null}],
            "usage": {"prompt_tokens": 5, "completion_tokens": null, "total_tokens": 5},
            "error": {"message": null, "type": null}
        }))
        .unwrap();
        assert_eq!(response.choices[0].message.string_content(), "ok");
        assert_eq!(
            response.usage,
            Some(Usage {
                prompt_tokens: 5,
                completion_tokens: 0,
                total_tokens: 5
            })
        );
        assert!(response.provider_error().is_none());

        let response: TextResponse =
            serde_json::from_value(json!({"choices": null, "usage": null})).unwrap();
        assert!(response.choices.is_empty());
        assert_eq!(response.usage, None);

        let choice: TextResponseChoice = serde_json::from_value(json!({"message": null})).unwrap();
        assert_eq!(choice.message, Message::default());
    }

    #[test]
    fn test_null_stream_choices_keep_usage() {
        let chunk: ChatCompletionsStreamResponse = serde_json::from_value(json!({
            "choices": null,
            "usage": {"prompt_tokens": 3, "completion_tokens": 40, "total_tokens": 43}
        }))
        .unwrap();
        assert!(chunk.choices.is_empty());
        assert_eq!(chunk.usage, Some(Usage::new(3, 40)));
        assert!(!chunk.is_empty_heartbeat());

        let chunk: CompletionsStreamResponse =
            serde_json::from_value(json!({"choices": [{"text": null}]})).unwrap();
        assert_eq!(chunk.choices[0].text, "");
    }
}
