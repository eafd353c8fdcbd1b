use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::errors::RelayError;
use crate::providers::ProviderId;
use crate::relay::RouteMeta;

pub const API_KEY_HEADER: &str = "api-key";
pub const REFERER_HEADER: &str = "HTTP-Referer";
pub const TITLE_HEADER: &str = "X-Title";

/// Identification headers some aggregators use for attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionHeaders {
    pub referer: String,
    pub title: String,
}

impl Default for AttributionHeaders {
    fn default() -> Self {
        Self {
            referer: "https://github.com/relayllm".to_string(),
            title: "relayllm".to_string(),
        }
    }
}

/// Cross-cutting headers copied from the client request.
pub fn setup_common_headers(headers: &mut HeaderMap, client_headers: &HeaderMap, meta: &RouteMeta) {
    let content_type = client_headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, content_type);

    match client_headers.get(ACCEPT) {
        Some(accept) => {
            headers.insert(ACCEPT, accept.clone());
        }
        None if meta.is_stream => {
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        }
        None => {}
    }
}

/// Common headers first, then provider-specific authentication.
pub fn setup_request_headers(
    headers: &mut HeaderMap,
    client_headers: &HeaderMap,
    meta: &RouteMeta,
    attribution: &AttributionHeaders,
) -> Result<(), RelayError> {
    setup_common_headers(headers, client_headers, meta);

    if meta.provider.uses_api_key_header() {
        headers.insert(
            HeaderName::from_static(API_KEY_HEADER),
            header_value(API_KEY_HEADER, &meta.api_key)?,
        );
        return Ok(());
    }

    headers.insert(
        AUTHORIZATION,
        header_value("Authorization", &format!("Bearer {}", meta.api_key))?,
    );

    if meta.provider.sends_attribution_headers() {
        headers.insert(
            HeaderName::from_static("http-referer"),
            header_value(REFERER_HEADER, &attribution.referer)?,
        );
        headers.insert(
            HeaderName::from_static("x-title"),
            header_value(TITLE_HEADER, &attribution.title)?,
        );
    }
    Ok(())
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, RelayError> {
    HeaderValue::from_str(value).map_err(|_| RelayError::InvalidHeader(name.to_string()))
}
