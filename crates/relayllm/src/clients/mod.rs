pub mod endpoints;
pub mod headers;

pub use endpoints::{full_request_url, resolve_url, strategy_for, UrlStrategy};
pub use headers::{setup_common_headers, setup_request_headers, AttributionHeaders};
