use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::apis::openai::{ChatCompletionsRequest, ImageRequest, StreamOptions};
use crate::apis::RelayMode;
use crate::errors::RelayError;

/// Model-specific parameter overrides applied before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuirkConfig {
    /// Models that reject custom temperatures and take `max_completion_tokens`.
    pub reasoning_models: Vec<String>,
    /// Models that always get a reasoning effort when the client set none.
    pub default_effort_models: Vec<String>,
    pub default_reasoning_effort: String,
    pub forced_temperature: f64,
}

impl Default for QuirkConfig {
    fn default() -> Self {
        Self {
            reasoning_models: vec!["o3".to_string(), "o3-mini".to_string(), "o4-mini".to_string()],
            default_effort_models: vec!["o4-mini".to_string()],
            default_reasoning_effort: "high".to_string(),
            forced_temperature: 1.0,
        }
    }
}

impl QuirkConfig {
    pub fn is_reasoning_model(&self, model: &str) -> bool {
        self.reasoning_models.iter().any(|m| m == model)
    }

    fn wants_default_effort(&self, model: &str) -> bool {
        self.default_effort_models.iter().any(|m| m == model)
    }
}

/// Body that leaves the gateway: either the canonical request, or an ordered
/// field map when quirks changed the field set.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Canonical(ChatCompletionsRequest),
    Patched(Map<String, Value>),
}

impl OutboundBody {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RelayError> {
        match self {
            OutboundBody::Canonical(request) => request.to_bytes(),
            OutboundBody::Patched(map) => serde_json::to_vec(map),
        }
        .map_err(RelayError::Marshal)
    }

    pub fn as_canonical(&self) -> Option<&ChatCompletionsRequest> {
        match self {
            OutboundBody::Canonical(request) => Some(request),
            OutboundBody::Patched(_) => None,
        }
    }

    pub fn as_patched(&self) -> Option<&Map<String, Value>> {
        match self {
            OutboundBody::Canonical(_) => None,
            OutboundBody::Patched(map) => Some(map),
        }
    }
}

/// Rewrite `request` per model quirks. Rules apply in order to the same
/// request; see the individual steps below.
pub fn convert_request(
    mode: RelayMode,
    request: Option<ChatCompletionsRequest>,
    quirks: &QuirkConfig,
) -> Result<OutboundBody, RelayError> {
    let mut request =
        request.ok_or_else(|| RelayError::InvalidRequest("request is nil".to_string()))?;

    // usage accounting needs the provider's final usage chunk
    if request.stream {
        request
            .stream_options
            .get_or_insert_with(StreamOptions::default)
            .include_usage = true;
    }

    let reasoning = quirks.is_reasoning_model(&request.model);
    if reasoning {
        request.temperature = Some(quirks.forced_temperature);

        let completion_limit = request
            .max_completion_tokens
            .or_else(|| request.legacy_max_tokens());
        if let Some(limit) = completion_limit {
            debug!(
                "migrating token limit for model={} mode={} max_completion_tokens={}",
                request.model, mode, limit
            );
            let mut map = request.to_field_map();
            map.shift_remove("max_tokens");
            map.insert("max_completion_tokens".to_string(), Value::from(limit));
            if request.reasoning_effort.is_none() {
                map.insert(
                    "reasoning_effort".to_string(),
                    Value::from(quirks.default_reasoning_effort.clone()),
                );
            }
            return Ok(OutboundBody::Patched(map));
        }
    }

    if quirks.wants_default_effort(&request.model) && request.reasoning_effort.is_none() {
        request.reasoning_effort = Some(quirks.default_reasoning_effort.clone());
    }

    Ok(OutboundBody::Canonical(request))
}

pub fn convert_image_request(request: Option<ImageRequest>) -> Result<ImageRequest, RelayError> {
    request.ok_or_else(|| RelayError::InvalidRequest("request is nil".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(model: &str) -> ChatCompletionsRequest {
        ChatCompletionsRequest {
            model: model.to_string(),
            ..Default::default()
        }
    }

    fn convert(req: ChatCompletionsRequest) -> OutboundBody {
        convert_request(RelayMode::ChatCompletions, Some(req), &QuirkConfig::default()).unwrap()
    }

    #[test]
    fn test_absent_request_is_input_error() {
        let err = convert_request(RelayMode::ChatCompletions, None, &QuirkConfig::default())
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
        assert!(convert_image_request(None).is_err());
    }

    #[test]
    fn test_non_reasoning_model_is_unchanged() {
        let mut req = request("gpt-4o");
        req.max_tokens = Some(256);
        req.temperature = Some(0.2);

        let out = convert(req.clone());
        assert_eq!(out, OutboundBody::Canonical(req));
    }

    #[test]
    fn test_unmigrated_request_is_idempotent() {
        let mut req = request("gpt-4o-mini");
        req.max_tokens = Some(64);
        req.stream = true;

        let first = convert(req);
        let again = convert(first.as_canonical().unwrap().clone());
        assert_eq!(first, again);
    }

    #[test]
    fn test_stream_forces_include_usage() {
        let mut req = request("gpt-4o");
        req.stream = true;
        req.stream_options = Some(StreamOptions {
            include_usage: false,
        });
        let out = convert(req);
        assert_eq!(
            out.as_canonical().unwrap().stream_options,
            Some(StreamOptions {
                include_usage: true
            })
        );

        let mut req = request("gpt-4o");
        req.stream = true;
        let out = convert(req);
        assert!(out.as_canonical().unwrap().stream_options.as_ref().unwrap().include_usage);
    }

    #[test]
    fn test_non_stream_leaves_stream_options_alone() {
        let out = convert(request("gpt-4o"));
        assert_eq!(out.as_canonical().unwrap().stream_options, None);
    }

    #[test]
    fn test_o3_legacy_limit_migrates() {
        let mut req = request("o3");
        req.max_tokens = Some(128);

        let out = convert(req);
        let map = out.as_patched().expect("migrated to field map");
        assert_eq!(map.get("max_completion_tokens"), Some(&json!(128)));
        assert!(!map.contains_key("max_tokens"));
        assert_eq!(map.get("reasoning_effort"), Some(&json!("high")));
        assert_eq!(map.get("temperature"), Some(&json!(1.0)));
    }

    #[test]
    fn test_explicit_completion_limit_wins() {
        let mut req = request("o3-mini");
        req.max_tokens = Some(999);
        req.max_completion_tokens = Some(64);

        let out = convert(req);
        let map = out.as_patched().unwrap();
        assert_eq!(map.get("max_completion_tokens"), Some(&json!(64)));
        assert!(!map.contains_key("max_tokens"));
    }

    #[test]
    fn test_client_reasoning_effort_is_kept() {
        let mut req = request("o3");
        req.max_completion_tokens = Some(32);
        req.reasoning_effort = Some("low".to_string());

        let out = convert(req);
        assert_eq!(out.as_patched().unwrap().get("reasoning_effort"), Some(&json!("low")));
    }

    #[test]
    fn test_patched_map_copies_other_fields() {
        let mut req = request("o3");
        req.max_tokens = Some(10);
        req.user = Some("user-42".to_string());
        req.stream = true;
        req.extra.insert("metadata".to_string(), json!({"trace": "abc"}));

        let out = convert(req);
        let map = out.as_patched().unwrap();
        assert_eq!(map.get("model"), Some(&json!("o3")));
        assert_eq!(map.get("user"), Some(&json!("user-42")));
        assert_eq!(map.get("stream"), Some(&json!(true)));
        assert_eq!(map.get("stream_options"), Some(&json!({"include_usage": true})));
        assert_eq!(map.get("metadata"), Some(&json!({"trace": "abc"})));

        let body: Value = serde_json::from_slice(&out.to_bytes().unwrap()).unwrap();
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_reasoning_model_without_limits_stays_typed() {
        let mut req = request("o3");
        req.temperature = Some(0.3);
        req.max_tokens = Some(0);

        let out = convert(req);
        let typed = out.as_canonical().expect("no migration without a limit");
        assert_eq!(typed.temperature, Some(1.0));
        assert_eq!(typed.reasoning_effort, None);
        assert_eq!(typed.max_tokens, Some(0));
    }

    #[test]
    fn test_o4_mini_gets_default_effort_while_typed() {
        let out = convert(request("o4-mini"));
        let typed = out.as_canonical().unwrap();
        assert_eq!(typed.reasoning_effort.as_deref(), Some("high"));
        assert_eq!(typed.temperature, Some(1.0));
    }

    #[test]
    fn test_quirk_set_is_configurable() {
        let quirks = QuirkConfig {
            reasoning_models: vec!["gpt-5".to_string(), "gpt-5-pro".to_string()],
            ..Default::default()
        };
        let mut req = request("gpt-5");
        req.max_tokens = Some(128);

        let out = convert_request(RelayMode::ChatCompletions, Some(req), &quirks).unwrap();
        let map = out.as_patched().unwrap();
        assert_eq!(map.get("max_completion_tokens"), Some(&json!(128)));
        assert!(!map.contains_key("max_tokens"));

        // o3 is no longer special under this configuration
        let mut req = request("o3");
        req.max_tokens = Some(128);
        let out = convert_request(RelayMode::ChatCompletions, Some(req.clone()), &quirks).unwrap();
        assert_eq!(out, OutboundBody::Canonical(req));
    }
}
