//! Credential models: redacted secrets, the access/refresh pair, and JWT expiry inspection.

pub mod jwt;
pub mod secret;

pub use secret::*;

// self
use crate::_prelude::*;

/// Access token + refresh token owned by a [`CredentialStore`](crate::store::CredentialStore).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	/// Bearer credential attached to outgoing requests.
	pub access_token: Option<TokenSecret>,
	/// Long-lived credential exchanged for a new access token.
	pub refresh_token: Option<TokenSecret>,
}
impl CredentialPair {
	/// Creates a pair holding both tokens.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: Some(TokenSecret::new(access_token)),
			refresh_token: Some(TokenSecret::new(refresh_token)),
		}
	}
}
