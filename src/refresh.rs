//! Credential renewal: the refresh endpoint contract, the single-flight state, and counters.
//!
//! The client drives a refresh cycle whenever a request fails with
//! [`Error::AuthExpired`]. Exactly one request (the leader) calls the [`RefreshEndpoint`];
//! every other request that fails the same way while the call is in flight joins the
//! running cycle through [`RefreshState`] and is replayed by the leader in FIFO order once
//! the new credential is stored.

mod metrics;

pub mod endpoint;
pub mod state;

pub use endpoint::*;
pub use metrics::RefreshMetrics;
pub use state::*;

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by [`RefreshEndpoint::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RefreshedCredentials>> + 'a + Send>>;

/// Exchanges a refresh token for a new access token.
pub trait RefreshEndpoint
where
	Self: Send + Sync,
{
	/// Calls the renewal endpoint with `refresh_token`.
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

/// Credentials issued by a successful renewal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshedCredentials {
	/// New access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the endpoint issued one.
	pub refresh_token: Option<TokenSecret>,
}
