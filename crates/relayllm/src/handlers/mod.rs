//! Non-stream decoders. Each reads the whole upstream body, closes it, and
//! only then decides whether anything reaches the client, so a provider error
//! can still be rendered as a clean gateway error response.

pub mod responses;

pub use responses::responses_handler;

use http::{HeaderMap, StatusCode};
use log::{debug, warn};
use serde::Deserialize;
use std::io::Read;

use crate::apis::openai::{OpenAIError, TextResponse, Usage};
use crate::errors::RelayError;
use crate::relay::{ClientResponse, UpstreamBody, UpstreamResponse};
use crate::usage::{count_choice_tokens, needs_fallback, Tokenizer};

/// Chat/completions/embeddings envelope decoder.
///
/// Returns the usage to bill: the envelope's own figures when plausible,
/// otherwise a tokenizer count over every choice's content.
pub fn text_handler<B, C>(
    response: UpstreamResponse<B>,
    client: &mut C,
    tokenizer: &dyn Tokenizer,
    model: &str,
    prompt_tokens: usize,
) -> Result<Usage, RelayError>
where
    B: UpstreamBody,
    C: ClientResponse + ?Sized,
{
    let UpstreamResponse {
        status,
        headers,
        mut body,
    } = response;
    debug!("upstream responded with status {}", status);

    let bytes = read_and_close(&mut body)?;
    let envelope: TextResponse = serde_json::from_slice(&bytes).map_err(RelayError::Unmarshal)?;
    reject_provider_error(status, envelope.error.as_ref())?;

    replay(client, status, &headers, &bytes)?;

    let usage = envelope.usage.unwrap_or_default();
    if !needs_fallback(&usage) {
        return Ok(usage);
    }
    let completion_tokens = count_choice_tokens(tokenizer, &envelope.choices, model);
    debug!(
        "provider usage missing, counted completion_tokens={} for model {}",
        completion_tokens, model
    );
    Ok(Usage::new(prompt_tokens, completion_tokens))
}

#[derive(Debug, Deserialize, Default)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<OpenAIError>,
}

/// Image generation responses carry no token usage; only the error check and
/// the verbatim replay apply.
pub fn image_handler<B, C>(response: UpstreamResponse<B>, client: &mut C) -> Result<(), RelayError>
where
    B: UpstreamBody,
    C: ClientResponse + ?Sized,
{
    let UpstreamResponse {
        status,
        headers,
        mut body,
    } = response;
    debug!("upstream responded with status {}", status);

    let bytes = read_and_close(&mut body)?;
    let envelope: ErrorEnvelope = serde_json::from_slice(&bytes).map_err(RelayError::Unmarshal)?;
    reject_provider_error(status, envelope.error.as_ref())?;

    replay(client, status, &headers, &bytes)
}

/// Drain the body and close it exactly once, whatever the read outcome.
pub(crate) fn read_and_close<B: UpstreamBody + ?Sized>(body: &mut B) -> Result<Vec<u8>, RelayError> {
    let mut bytes = Vec::new();
    let read = body.read_to_end(&mut bytes);
    let closed = body.close();
    read.map_err(RelayError::ReadBody)?;
    closed.map_err(RelayError::CloseBody)?;
    Ok(bytes)
}

fn reject_provider_error(status: StatusCode, error: Option<&OpenAIError>) -> Result<(), RelayError> {
    match error.filter(|e| !e.error_type.is_empty()) {
        Some(error) => {
            warn!("upstream returned error (status {}): {}", status, error);
            Err(RelayError::Upstream {
                status,
                error: error.clone(),
            })
        }
        None => Ok(()),
    }
}

/// Headers (first value per name), then status, then the untouched body.
pub(crate) fn replay<C: ClientResponse + ?Sized>(
    client: &mut C,
    status: StatusCode,
    headers: &HeaderMap,
    bytes: &[u8],
) -> Result<(), RelayError> {
    for name in headers.keys() {
        if let Some(value) = headers.get(name) {
            client.set_header(name.clone(), value.clone());
        }
    }
    client.write_status(status);
    client.write_all(bytes).map_err(RelayError::CopyBody)?;
    client.flush().map_err(RelayError::CopyBody)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::relay::BufferedClient;
    use crate::streaming::test_support::{FailingClient, TrackedBody};
    use http::header::{CONTENT_TYPE, SET_COOKIE};
    use http::HeaderValue;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    pub(crate) fn words(_model: &str, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn ok_response(body: &str) -> UpstreamResponse<Cursor<Vec<u8>>> {
        UpstreamResponse::new(StatusCode::OK, Cursor::new(body.as_bytes().to_vec()))
    }

    #[test]
    fn test_body_round_trips_byte_for_byte() {
        let body = "{\"id\":\"chatcmpl-9\",  \"choices\":[{\"index\":0,\"message\":{\"role\":\"assistant\",\"content\":\"ok\"}}],\n\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":1,\"total_tokens\":4},\"x_vendor\":[1,2]}";
        let mut client = BufferedClient::new();
        let usage = text_handler(ok_response(body), &mut client, &words, "gpt-4o", 99).unwrap();

        assert_eq!(client.body, body.as_bytes());
        assert_eq!(client.status, Some(StatusCode::OK));
        assert_eq!(usage, Usage::new(3, 1));
    }

    #[test]
    fn test_zero_total_falls_back_to_tokenizer() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello world"}}],"usage":{"prompt_tokens":0,"completion_tokens":0,"total_tokens":0}}"#;
        let mut client = BufferedClient::new();
        let usage = text_handler(ok_response(body), &mut client, &words, "M", 10).unwrap();

        assert_eq!(usage, Usage::new(10, 2));
        assert_eq!(usage.total_tokens, 12);
    }

    #[test]
    fn test_missing_usage_counts_every_choice() {
        let body = r#"{"choices":[{"message":{"content":"one two"}},{"message":{"content":[{"type":"text","text":"three"}]}}]}"#;
        let mut client = BufferedClient::new();
        let usage = text_handler(ok_response(body), &mut client, &words, "M", 4).unwrap();
        assert_eq!(usage, Usage::new(4, 3));
    }

    #[test]
    fn test_inconsistent_usage_is_trusted() {
        let body = r#"{"choices":[],"usage":{"prompt_tokens":0,"completion_tokens":7,"total_tokens":2}}"#;
        let mut client = BufferedClient::new();
        let usage = text_handler(ok_response(body), &mut client, &words, "M", 10).unwrap();
        assert_eq!(
            usage,
            Usage {
                prompt_tokens: 0,
                completion_tokens: 7,
                total_tokens: 2
            }
        );
    }

    #[test]
    fn test_null_usage_fields_are_forwarded_not_rejected() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"a b c"}}],"usage":{"prompt_tokens":5,"completion_tokens":null,"total_tokens":5}}"#;
        let mut client = BufferedClient::new();
        let usage = text_handler(ok_response(body), &mut client, &words, "M", 2).unwrap();

        assert_eq!(client.body, body.as_bytes());
        assert_eq!(
            usage,
            Usage {
                prompt_tokens: 5,
                completion_tokens: 0,
                total_tokens: 5
            }
        );
    }

    #[test]
    fn test_null_choices_fall_back_to_prompt_only_usage() {
        let body = r#"{"choices":null,"usage":{"prompt_tokens":0,"completion_tokens":0,"total_tokens":0}}"#;
        let mut client = BufferedClient::new();
        let usage = text_handler(ok_response(body), &mut client, &words, "M", 8).unwrap();

        assert_eq!(client.body, body.as_bytes());
        assert_eq!(usage, Usage::new(8, 0));
    }

    #[test]
    fn test_provider_error_forwards_nothing() {
        let body = r#"{"error":{"message":"model overloaded","type":"server_error","code":"overloaded"}}"#;
        let tracked = TrackedBody::new(body);
        let closes = tracked.closes.clone();
        let response = UpstreamResponse::new(StatusCode::SERVICE_UNAVAILABLE, tracked);
        let mut client = BufferedClient::new();

        let err = text_handler(response, &mut client, &words, "M", 0).unwrap_err();

        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "overloaded");
        assert!(client.body.is_empty());
        assert_eq!(client.status, None);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_error_without_type_is_not_a_provider_error() {
        let body = r#"{"choices":[],"error":{"message":"","type":""},"usage":{"prompt_tokens":1,"completion_tokens":1,"total_tokens":2}}"#;
        let mut client = BufferedClient::new();
        assert!(text_handler(ok_response(body), &mut client, &words, "M", 0).is_ok());
        assert_eq!(client.body, body.as_bytes());
    }

    #[test]
    fn test_unparseable_body_is_fatal() {
        let mut client = BufferedClient::new();
        let err = text_handler(ok_response("<html>bad gateway</html>"), &mut client, &words, "M", 0)
            .unwrap_err();
        assert_eq!(err.code(), "unmarshal_response_body_failed");
        assert!(client.body.is_empty());
    }

    #[test]
    fn test_headers_are_replayed_first_value_only() {
        let mut response = ok_response(r#"{"choices":[]}"#);
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response.headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        response.headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));

        let mut client = BufferedClient::new();
        text_handler(response, &mut client, &words, "M", 0).unwrap();

        assert_eq!(client.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(client.headers.get_all(SET_COOKIE).iter().count(), 1);
        assert_eq!(client.headers.get(SET_COOKIE).unwrap(), "a=1");
    }

    #[test]
    fn test_close_failure_is_fatal() {
        let response = UpstreamResponse::new(StatusCode::OK, TrackedBody::failing_close("{}"));
        let mut client = BufferedClient::new();
        let err = text_handler(response, &mut client, &words, "M", 0).unwrap_err();
        assert_eq!(err.code(), "close_response_body_failed");
        assert!(client.body.is_empty());
    }

    #[test]
    fn test_copy_failure_is_fatal() {
        let mut client = FailingClient {
            budget: 0,
            written: Vec::new(),
        };
        let err = text_handler(ok_response(r#"{"choices":[]}"#), &mut client, &words, "M", 0)
            .unwrap_err();
        assert_eq!(err.code(), "copy_response_body_failed");
    }

    #[test]
    fn test_image_response_is_replayed() {
        let body = r#"{"created":1700000000,"data":[{"url":"https://img.example/1.png"}]}"#;
        let mut client = BufferedClient::new();
        image_handler(ok_response(body), &mut client).unwrap();
        assert_eq!(client.body_str(), body);
    }

    #[test]
    fn test_image_provider_error_is_upstream() {
        let body = r#"{"error":{"message":"content policy","type":"invalid_request_error"}}"#;
        let response = UpstreamResponse::new(StatusCode::BAD_REQUEST, Cursor::new(body));
        let mut client = BufferedClient::new();
        let err = image_handler(response, &mut client).unwrap_err();

        assert!(matches!(err, RelayError::Upstream { .. }));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(client.body.is_empty());
    }
}
