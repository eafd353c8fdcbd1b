//! Per-request routing metadata and the I/O seams the decoders work against.
//!
//! The transport and the client connection are owned by the caller; the core
//! only sees an [`UpstreamResponse`] to read and a [`ClientResponse`] to write.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::apis::RelayMode;
use crate::providers::ProviderId;

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    pub api_version: Option<String>,
}

impl ChannelConfig {
    pub fn api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_AZURE_API_VERSION)
    }
}

/// Read-only descriptor of one inbound request, built by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub provider: ProviderId,
    pub mode: RelayMode,
    pub base_url: String,
    pub api_key: String,
    pub actual_model_name: String,
    /// Path (and query) of the inbound client request, e.g. `/v1/chat/completions`.
    pub request_url_path: String,
    pub is_stream: bool,
    pub prompt_tokens: usize,
    pub config: ChannelConfig,
}

impl RouteMeta {
    pub fn new(provider: ProviderId, base_url: &str, request_url_path: &str) -> Self {
        Self {
            provider,
            mode: RelayMode::from_path(request_url_path),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: String::new(),
            actual_model_name: String::new(),
            request_url_path: request_url_path.to_string(),
            is_stream: false,
            prompt_tokens: 0,
            config: ChannelConfig::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = api_key.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.actual_model_name = model.to_string();
        self
    }

    pub fn with_stream(mut self, is_stream: bool) -> Self {
        self.is_stream = is_stream;
        self
    }

    pub fn with_prompt_tokens(mut self, prompt_tokens: usize) -> Self {
        self.prompt_tokens = prompt_tokens;
        self
    }

    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.config.api_version = Some(api_version.to_string());
        self
    }
}

// ============================================================================
// UPSTREAM
// ============================================================================

/// Body of an upstream HTTP response. `close` is called exactly once by
/// whichever decoder consumes the body.
pub trait UpstreamBody: BufRead {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: AsRef<[u8]>> UpstreamBody for Cursor<T> {}

impl<R: Read> UpstreamBody for BufReader<R> {}

impl<B: UpstreamBody + ?Sized> UpstreamBody for Box<B> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

pub struct UpstreamResponse<B> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: B,
}

impl<B: UpstreamBody> UpstreamResponse<B> {
    pub fn new(status: StatusCode, body: B) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Write side of the client connection.
pub trait ClientResponse {
    /// Replace any existing value for `name`.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    fn write_status(&mut self, status: StatusCode);

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory client sink. Useful for buffering a whole response before
/// handing it to a server framework, and for tests.
#[derive(Debug, Default)]
pub struct BufferedClient {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl BufferedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ClientResponse for BufferedClient {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(bytes);
        Ok(())
    }
}

// ============================================================================
// CANCELLATION
// ============================================================================

/// Shared flag a server sets when the client goes away. Decoders check it
/// before every upstream read.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
