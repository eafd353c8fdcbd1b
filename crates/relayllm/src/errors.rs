use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::apis::openai::OpenAIError;
use crate::apis::RelayMode;
use crate::providers::ProviderId;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("relay mode {mode} is not supported by provider {provider}")]
    UnsupportedMode { provider: ProviderId, mode: RelayMode },

    #[error("invalid base url `{base_url}`: {source}")]
    InvalidBaseUrl {
        base_url: String,
        #[source]
        source: url::ParseError,
    },

    /// The provider answered with an error envelope. Nothing was forwarded.
    #[error("upstream error (status {status}): {error}")]
    Upstream { status: StatusCode, error: OpenAIError },

    #[error("invalid value for header {0}")]
    InvalidHeader(String),

    #[error("failed to read upstream response body: {0}")]
    ReadBody(#[source] std::io::Error),

    #[error("failed to close upstream response body: {0}")]
    CloseBody(#[source] std::io::Error),

    #[error("failed to unmarshal upstream response body: {0}")]
    Unmarshal(#[source] serde_json::Error),

    #[error("failed to marshal request body: {0}")]
    Marshal(#[source] serde_json::Error),

    #[error("failed to copy response body to client: {0}")]
    CopyBody(#[source] std::io::Error),

    #[error("failed to write to client: {0}")]
    ClientWrite(#[source] std::io::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) | RelayError::UnsupportedMode { .. } => {
                StatusCode::BAD_REQUEST
            }
            RelayError::Upstream { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code rendered to clients.
    pub fn code(&self) -> &str {
        match self {
            RelayError::InvalidRequest(_) => "invalid_request",
            RelayError::UnsupportedMode { .. } => "unsupported_relay_mode",
            RelayError::InvalidBaseUrl { .. } => "invalid_base_url",
            RelayError::Upstream { error, .. } => error
                .code
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or(error.error_type.as_str()),
            RelayError::InvalidHeader(_) => "invalid_header_value",
            RelayError::ReadBody(_) => "read_response_body_failed",
            RelayError::CloseBody(_) => "close_response_body_failed",
            RelayError::Unmarshal(_) => "unmarshal_response_body_failed",
            RelayError::Marshal(_) => "marshal_request_body_failed",
            RelayError::CopyBody(_) => "copy_response_body_failed",
            RelayError::ClientWrite(_) => "client_write_failed",
        }
    }

    /// Client-facing JSON envelope. Upstream errors are rendered verbatim.
    pub fn to_error_body(&self) -> Value {
        match self {
            RelayError::Upstream { error, .. } => json!({ "error": error }),
            _ => json!({
                "error": {
                    "message": self.to_string(),
                    "type": "relay_error",
                    "param": "",
                    "code": self.code(),
                }
            }),
        }
    }
}
