//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::CredentialStore,
};

/// Thread-safe credential store that keeps the pair in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialStore(Arc<RwLock<CredentialPair>>);
impl MemoryCredentialStore {
	/// Creates a store seeded with `pair`.
	pub fn new(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(pair)))
	}

	/// Returns a copy of the stored pair.
	pub fn snapshot(&self) -> CredentialPair {
		self.0.read().clone()
	}

	/// Drops both tokens.
	pub fn clear(&self) {
		*self.0.write() = CredentialPair::default();
	}
}
impl CredentialStore for MemoryCredentialStore {
	fn access_token(&self) -> Option<TokenSecret> {
		self.0.read().access_token.clone().filter(|token| !token.is_blank())
	}

	fn refresh_token(&self) -> Option<TokenSecret> {
		self.0.read().refresh_token.clone().filter(|token| !token.is_blank())
	}

	fn set_access_token(&self, token: TokenSecret) {
		self.0.write().access_token = Some(token);
	}

	fn set_refresh_token(&self, token: TokenSecret) {
		self.0.write().refresh_token = Some(token);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn blank_tokens_read_as_missing() {
		let store = MemoryCredentialStore::new(CredentialPair {
			access_token: Some(TokenSecret::new("")),
			refresh_token: Some(TokenSecret::new("refresh-1")),
		});

		assert_eq!(store.access_token(), None);
		assert_eq!(store.refresh_token().as_ref().map(TokenSecret::expose), Some("refresh-1"));
	}

	#[test]
	fn clones_share_the_same_pair() {
		let store = MemoryCredentialStore::new(CredentialPair::new("access-1", "refresh-1"));
		let clone = store.clone();

		clone.set_access_token("access-2".into());

		assert_eq!(store.access_token().as_ref().map(TokenSecret::expose), Some("access-2"));

		store.clear();

		assert_eq!(clone.snapshot(), CredentialPair::default());
	}
}
