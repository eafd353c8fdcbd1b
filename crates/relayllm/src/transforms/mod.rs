//! Request rewriting applied before a canonical request leaves the gateway.
pub mod normalize;

pub use normalize::{convert_image_request, convert_request, OutboundBody, QuirkConfig};
