//! relayllm: protocol translation between a gateway's canonical
//! OpenAI-shaped requests and OpenAI-compatible upstream providers.
//!
//! Outbound, an [`Adaptor`] resolves the provider URL, sets auth headers and
//! applies per-model request quirks. Inbound, it relays the upstream response
//! to the client (streamed or whole) and reports token usage for billing.

pub mod adaptor;
pub mod apis;
pub mod clients;
pub mod errors;
pub mod handlers;
pub mod providers;
pub mod relay;
pub mod streaming;
pub mod transforms;
pub mod usage;

// Re-export important types and traits
pub use adaptor::{Adaptor, AdaptorConfig, OpenAICompatibleAdaptor, OutboundRequest, ResponseRoute};
pub use apis::{ChatCompletionsRequest, ImageRequest, RelayMode, Usage};
pub use errors::RelayError;
pub use providers::ProviderId;
pub use relay::{
    BufferedClient, CancellationToken, ClientResponse, RouteMeta, UpstreamBody, UpstreamResponse,
};
pub use streaming::StreamOutcome;
pub use transforms::{OutboundBody, QuirkConfig};
pub use usage::Tokenizer;

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const RESPONSES_PATH: &str = "/v1/responses";
