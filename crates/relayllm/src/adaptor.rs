//! The adaptor ties the pieces together for one upstream call: URL, headers
//! and body on the way out, decoder selection and usage on the way back.

use http::HeaderMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::apis::openai::{ChatCompletionsRequest, ImageRequest, Usage};
use crate::apis::RelayMode;
use crate::clients::{self, AttributionHeaders};
use crate::errors::RelayError;
use crate::handlers::{image_handler, responses_handler, text_handler};
use crate::providers::ProviderId;
use crate::relay::{CancellationToken, ClientResponse, RouteMeta, UpstreamBody, UpstreamResponse};
use crate::streaming::{ResponsesPassthroughDecoder, StreamDecoder, StreamOutcome};
use crate::transforms::{self, OutboundBody, QuirkConfig};
use crate::usage::{finalize_stream_usage, Tokenizer};

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptorConfig {
    #[serde(default)]
    pub quirks: QuirkConfig,
    #[serde(default)]
    pub attribution: AttributionHeaders,
}

/// Everything the transport needs to send one upstream request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Which decoder handles an upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRoute {
    /// Azure Responses stream, relayed byte-for-byte.
    ResponsesPassthrough,
    /// Azure Responses non-stream body.
    ResponsesBody,
    Stream,
    Image,
    Text,
}

impl ResponseRoute {
    pub fn for_meta(meta: &RouteMeta) -> Self {
        let azure_responses =
            meta.provider == ProviderId::AzureOpenAI && meta.mode == RelayMode::Responses;
        match (azure_responses, meta.is_stream) {
            (true, true) => ResponseRoute::ResponsesPassthrough,
            (true, false) => ResponseRoute::ResponsesBody,
            (false, true) => ResponseRoute::Stream,
            (false, false) if meta.mode == RelayMode::ImagesGenerations => ResponseRoute::Image,
            (false, false) => ResponseRoute::Text,
        }
    }
}

/// Capabilities a provider family exposes to the dispatcher.
pub trait Adaptor {
    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError>;

    fn setup_request_headers(
        &self,
        headers: &mut HeaderMap,
        client_headers: &HeaderMap,
        meta: &RouteMeta,
    ) -> Result<(), RelayError>;

    fn convert_request(
        &self,
        mode: RelayMode,
        request: Option<ChatCompletionsRequest>,
    ) -> Result<OutboundBody, RelayError>;

    fn convert_image_request(&self, request: Option<ImageRequest>) -> Result<ImageRequest, RelayError>;

    /// Decode the upstream response into `client`. Returns the usage to bill,
    /// or `None` for responses that carry no token usage (images).
    fn do_response<B, C>(
        &self,
        response: UpstreamResponse<B>,
        client: &mut C,
        meta: &RouteMeta,
        tokenizer: &dyn Tokenizer,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Option<Usage>, RelayError>
    where
        B: UpstreamBody,
        C: ClientResponse + ?Sized;

    fn prepare_request(
        &self,
        meta: &RouteMeta,
        client_headers: &HeaderMap,
        request: Option<ChatCompletionsRequest>,
    ) -> Result<OutboundRequest, RelayError> {
        let body = self.convert_request(meta.mode, request)?.to_bytes()?;
        self.assemble(meta, client_headers, body)
    }

    fn prepare_image_request(
        &self,
        meta: &RouteMeta,
        client_headers: &HeaderMap,
        request: Option<ImageRequest>,
    ) -> Result<OutboundRequest, RelayError> {
        let request = self.convert_image_request(request)?;
        let body = serde_json::to_vec(&request).map_err(RelayError::Marshal)?;
        self.assemble(meta, client_headers, body)
    }

    fn assemble(
        &self,
        meta: &RouteMeta,
        client_headers: &HeaderMap,
        body: Vec<u8>,
    ) -> Result<OutboundRequest, RelayError> {
        let url = self.request_url(meta)?;
        let mut headers = HeaderMap::new();
        self.setup_request_headers(&mut headers, client_headers, meta)?;

        debug!(
            "outbound request: channel={} mode={} model={} stream={} url={} body={}",
            meta.provider,
            meta.mode,
            meta.actual_model_name,
            meta.is_stream,
            url,
            body_preview(&body)
        );

        Ok(OutboundRequest { url, headers, body })
    }
}

/// Adaptor for every provider speaking the OpenAI wire format, Azure and the
/// vendor-specific URL families included.
#[derive(Debug, Clone, Default)]
pub struct OpenAICompatibleAdaptor {
    config: AdaptorConfig,
}

impl OpenAICompatibleAdaptor {
    pub fn new(config: AdaptorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdaptorConfig {
        &self.config
    }
}

impl Adaptor for OpenAICompatibleAdaptor {
    fn request_url(&self, meta: &RouteMeta) -> Result<String, RelayError> {
        clients::resolve_url(meta)
    }

    fn setup_request_headers(
        &self,
        headers: &mut HeaderMap,
        client_headers: &HeaderMap,
        meta: &RouteMeta,
    ) -> Result<(), RelayError> {
        clients::setup_request_headers(headers, client_headers, meta, &self.config.attribution)
    }

    fn convert_request(
        &self,
        mode: RelayMode,
        request: Option<ChatCompletionsRequest>,
    ) -> Result<OutboundBody, RelayError> {
        transforms::convert_request(mode, request, &self.config.quirks)
    }

    fn convert_image_request(&self, request: Option<ImageRequest>) -> Result<ImageRequest, RelayError> {
        transforms::convert_image_request(request)
    }

    fn do_response<B, C>(
        &self,
        response: UpstreamResponse<B>,
        client: &mut C,
        meta: &RouteMeta,
        tokenizer: &dyn Tokenizer,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Option<Usage>, RelayError>
    where
        B: UpstreamBody,
        C: ClientResponse + ?Sized,
    {
        let model = meta.actual_model_name.as_str();
        let outcome: StreamOutcome = match ResponseRoute::for_meta(meta) {
            ResponseRoute::ResponsesPassthrough => {
                let mut decoder = ResponsesPassthroughDecoder::new();
                if let Some(token) = cancellation {
                    decoder = decoder.with_cancellation(token.clone());
                }
                decoder.decode(response.body, client)?
            }
            ResponseRoute::Stream => {
                let mut decoder = StreamDecoder::new(meta.mode);
                if let Some(token) = cancellation {
                    decoder = decoder.with_cancellation(token.clone());
                }
                decoder.decode(response.body, client)?
            }
            ResponseRoute::ResponsesBody => {
                return responses_handler(response, client, tokenizer, model, meta.prompt_tokens)
                    .map(Some);
            }
            ResponseRoute::Image => return image_handler(response, client).map(|()| None),
            ResponseRoute::Text => {
                return text_handler(response, client, tokenizer, model, meta.prompt_tokens)
                    .map(Some);
            }
        };

        if outcome.cancelled {
            debug!("stream for model {} cancelled by client", model);
        }
        Ok(Some(finalize_stream_usage(
            tokenizer,
            outcome.usage,
            &outcome.response_text,
            meta,
        )))
    }
}

/// At most `BODY_PREVIEW_LIMIT` bytes of `body`, cut on a char boundary.
fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= BODY_PREVIEW_LIMIT {
        return text.into_owned();
    }
    let mut end = BODY_PREVIEW_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
