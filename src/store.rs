//! Credential store contract and the built-in in-memory implementation.

pub mod memory;

pub use memory::MemoryCredentialStore;

// self
use crate::auth::TokenSecret;

/// Key-value view over the externally owned credential pair.
///
/// The pipeline reads the access token before every attempt, reads the refresh token when a
/// refresh cycle starts, and writes replacements after a successful renewal or when a
/// response carries a rotated token. Implementations must be cheap and non-blocking; any
/// persistence is the implementor's concern.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the current access token, if any.
	fn access_token(&self) -> Option<TokenSecret>;

	/// Returns the current refresh token, if any.
	fn refresh_token(&self) -> Option<TokenSecret>;

	/// Replaces the access token.
	fn set_access_token(&self, token: TokenSecret);

	/// Replaces the refresh token.
	fn set_refresh_token(&self, token: TokenSecret);
}
