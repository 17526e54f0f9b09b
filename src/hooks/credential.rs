//! Credential attachment.

// self
use crate::{auth::TokenSecret, http::Headers, options::RequestOptions, store::CredentialStore};

/// Formats the header value for `token`: `"{scheme} {token}"`, or the bare token when no
/// scheme is configured.
pub fn header_value(token: &TokenSecret, scheme: Option<&str>) -> String {
	match scheme.map(str::trim).filter(|scheme| !scheme.is_empty()) {
		Some(scheme) => format!("{scheme} {}", token.expose()),
		None => token.expose().to_owned(),
	}
}

/// Writes the stored access token into `headers` and returns the token that was attached.
///
/// The token is read from `store` on every call, so retries and replays always carry the
/// latest credential. When `with_token` is off, or the store holds no token, the credential
/// header is removed entirely rather than sent empty.
pub fn attach(
	headers: &mut Headers,
	options: &RequestOptions,
	store: &dyn CredentialStore,
) -> Option<TokenSecret> {
	let token = options.with_token.then(|| store.access_token()).flatten();

	match &token {
		Some(token) => headers.insert(
			options.authentication_header.as_str(),
			header_value(token, options.authentication_scheme.as_deref()),
		),
		None => headers.remove(&options.authentication_header),
	}

	token
}

/// Strips a leading `scheme` (case-insensitive) from a header value.
pub fn strip_scheme<'a>(value: &'a str, scheme: Option<&str>) -> &'a str {
	let value = value.trim();

	scheme
		.map(str::trim)
		.filter(|scheme| !scheme.is_empty())
		.and_then(|scheme| {
			let (head, rest) = value.split_at_checked(scheme.len())?;

			(head.eq_ignore_ascii_case(scheme) && rest.starts_with(' ')).then(|| rest.trim_start())
		})
		.unwrap_or(value)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::CredentialPair, store::MemoryCredentialStore};

	fn store() -> MemoryCredentialStore {
		MemoryCredentialStore::new(CredentialPair::new("access-1", "refresh-1"))
	}

	#[test]
	fn attaches_scheme_and_token() {
		let mut headers = Headers::new();
		let attached = attach(&mut headers, &RequestOptions::default(), &store());

		assert_eq!(attached.as_ref().map(TokenSecret::expose), Some("access-1"));
		assert_eq!(headers.get("authorization"), Some("Bearer access-1"));
	}

	#[test]
	fn custom_header_without_scheme_carries_the_bare_token() {
		let options = RequestOptions {
			authentication_header: "X-Authorization".into(),
			authentication_scheme: None,
			..RequestOptions::default()
		};
		let mut headers = Headers::new();

		attach(&mut headers, &options, &store());

		assert_eq!(headers.get("X-Authorization"), Some("access-1"));
		assert!(!headers.contains("Authorization"));
	}

	#[test]
	fn disabled_or_missing_tokens_leave_no_header() {
		let options = RequestOptions { with_token: false, ..RequestOptions::default() };
		let mut headers = Headers::from_iter([("Authorization", "Bearer stale")]);

		assert_eq!(attach(&mut headers, &options, &store()), None);
		assert!(!headers.contains("Authorization"));

		let mut headers = Headers::new();

		assert_eq!(
			attach(&mut headers, &RequestOptions::default(), &MemoryCredentialStore::default()),
			None
		);
		assert!(headers.is_empty());
	}

	#[test]
	fn scheme_stripping_is_case_insensitive() {
		assert_eq!(strip_scheme("bearer abc", Some("Bearer")), "abc");
		assert_eq!(strip_scheme(" Bearer  abc ", Some("Bearer")), "abc");
		assert_eq!(strip_scheme("Bearerabc", Some("Bearer")), "Bearerabc");
		assert_eq!(strip_scheme("abc", None), "abc");
	}
}
