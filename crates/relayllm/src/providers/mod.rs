//! Upstream provider identities.
//!
//! Every dispatch decision in the crate (URL shape, auth header, decoder
//! selection) is a `match` on [`ProviderId`].
pub mod id;

pub use id::{ProviderId, UnknownProvider};
