//! Request options, per-call overrides, and the pure merge between them.
//!
//! Options are plain data. A client holds one [`RequestOptions`] as its defaults; each call
//! may carry [`RequestOverrides`] (bound to the descriptor, passed to the call, or both) and
//! [`merge`] resolves them key by key. Both types deserialize from camelCase JSON and ignore
//! unknown keys.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// How failures are surfaced to the notifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorMessageMode {
	/// Do not notify.
	None,
	/// Transient toast-style message.
	#[default]
	Message,
	/// Blocking dialog.
	Modal,
}

/// Body encoding used for body-bearing requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
	/// `application/json`
	#[default]
	Json,
	/// `application/x-www-form-urlencoded`
	FormUrlEncoded,
}
impl ContentType {
	/// Returns the header value sent for this encoding.
	pub const fn header_value(self) -> &'static str {
		match self {
			Self::Json => "application/json;charset=UTF-8",
			Self::FormUrlEncoded => "application/x-www-form-urlencoded;charset=UTF-8",
		}
	}
}

/// Transient retry policy for GET requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
	/// Extra attempts after the first failure; `0` disables retrying.
	pub count: u32,
	/// Base wait between attempts, in milliseconds.
	pub wait_ms: u64,
}
impl RetryPolicy {
	/// Policy that never retries.
	pub const DISABLED: Self = Self { count: 0, wait_ms: 100 };

	/// Returns the wait before retry number `attempt` (1-based): the base wait scaled by the
	/// attempt number plus up to half the base wait of jitter.
	pub fn backoff(&self, attempt: u32) -> Duration {
		let base = self.wait_ms.saturating_mul(u64::from(attempt.max(1)));
		let jitter =
			if self.wait_ms > 1 { rand::rng().random_range(0..=self.wait_ms / 2) } else { 0 };

		Duration::from_millis(base.saturating_add(jitter))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::DISABLED
	}
}

/// Fully resolved options for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestOptions {
	/// Prepend [`url_prefix`](Self::url_prefix) to relative paths.
	pub join_prefix: bool,
	/// Path prefix shared by every API route (for example `/api`).
	pub url_prefix: Option<String>,
	/// Base origin used for relative paths.
	pub api_url: Option<String>,
	/// Keep parameters in the URL even for body-bearing methods.
	pub join_params_to_url: bool,
	/// Run the payload normalizer over outgoing bodies.
	pub format_date: bool,
	/// Unwrap the response envelope; otherwise return the raw payload.
	pub is_transform_response: bool,
	/// Return the transport response untouched.
	pub is_return_native_response: bool,
	/// Append a cache-busting timestamp to GET requests.
	pub join_time: bool,
	/// Attach the stored access token.
	pub with_token: bool,
	/// Transient retry policy.
	pub retry: RetryPolicy,
	/// Header that carries the credential.
	pub authentication_header: String,
	/// Scheme written before the credential, if any.
	pub authentication_scheme: Option<String>,
	/// How failures are surfaced to the notifier.
	pub error_message_mode: ErrorMessageMode,
	/// Body encoding.
	pub content_type: ContentType,
	/// Per-request timeout in milliseconds; `0` disables it.
	pub timeout_ms: u64,
}
impl RequestOptions {
	/// Returns the per-request timeout, if enabled.
	pub fn timeout(&self) -> Option<Duration> {
		(self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			join_prefix: true,
			url_prefix: None,
			api_url: None,
			join_params_to_url: false,
			format_date: true,
			is_transform_response: true,
			is_return_native_response: false,
			join_time: true,
			with_token: true,
			retry: RetryPolicy::default(),
			authentication_header: "Authorization".into(),
			authentication_scheme: Some("Bearer".into()),
			error_message_mode: ErrorMessageMode::default(),
			content_type: ContentType::default(),
			timeout_ms: 10_000,
		}
	}
}

/// Sparse overrides applied over [`RequestOptions`]; `None` keeps the default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestOverrides {
	/// Overrides [`RequestOptions::join_prefix`].
	pub join_prefix: Option<bool>,
	/// Overrides [`RequestOptions::url_prefix`].
	pub url_prefix: Option<String>,
	/// Overrides [`RequestOptions::api_url`].
	pub api_url: Option<String>,
	/// Overrides [`RequestOptions::join_params_to_url`].
	pub join_params_to_url: Option<bool>,
	/// Overrides [`RequestOptions::format_date`].
	pub format_date: Option<bool>,
	/// Overrides [`RequestOptions::is_transform_response`].
	pub is_transform_response: Option<bool>,
	/// Overrides [`RequestOptions::is_return_native_response`].
	pub is_return_native_response: Option<bool>,
	/// Overrides [`RequestOptions::join_time`].
	pub join_time: Option<bool>,
	/// Overrides [`RequestOptions::with_token`].
	pub with_token: Option<bool>,
	/// Overrides [`RequestOptions::retry`].
	pub retry: Option<RetryPolicy>,
	/// Overrides [`RequestOptions::authentication_header`].
	pub authentication_header: Option<String>,
	/// Overrides [`RequestOptions::authentication_scheme`]; an empty string removes the scheme.
	pub authentication_scheme: Option<String>,
	/// Overrides [`RequestOptions::error_message_mode`].
	pub error_message_mode: Option<ErrorMessageMode>,
	/// Overrides [`RequestOptions::content_type`].
	pub content_type: Option<ContentType>,
	/// Overrides [`RequestOptions::timeout_ms`].
	pub timeout_ms: Option<u64>,
}
impl RequestOverrides {
	/// Overrides that change nothing.
	pub fn none() -> Self {
		Self::default()
	}

	/// Sets the `with_token` override.
	pub fn with_token(mut self, value: bool) -> Self {
		self.with_token = Some(value);

		self
	}

	/// Sets the `is_return_native_response` override.
	pub fn native_response(mut self, value: bool) -> Self {
		self.is_return_native_response = Some(value);

		self
	}

	/// Sets the `is_transform_response` override.
	pub fn transform_response(mut self, value: bool) -> Self {
		self.is_transform_response = Some(value);

		self
	}

	/// Sets the `error_message_mode` override.
	pub fn error_message_mode(mut self, mode: ErrorMessageMode) -> Self {
		self.error_message_mode = Some(mode);

		self
	}

	/// Sets the `retry` override.
	pub fn retry(mut self, policy: RetryPolicy) -> Self {
		self.retry = Some(policy);

		self
	}

	/// Sets the `timeout_ms` override.
	pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = Some(timeout_ms);

		self
	}
}

/// Resolves `overrides` over `defaults`, key by key.
pub fn merge(defaults: &RequestOptions, overrides: &RequestOverrides) -> RequestOptions {
	let authentication_scheme = match &overrides.authentication_scheme {
		Some(scheme) if scheme.trim().is_empty() => None,
		Some(scheme) => Some(scheme.clone()),
		None => defaults.authentication_scheme.clone(),
	};

	RequestOptions {
		join_prefix: overrides.join_prefix.unwrap_or(defaults.join_prefix),
		url_prefix: overrides.url_prefix.clone().or_else(|| defaults.url_prefix.clone()),
		api_url: overrides.api_url.clone().or_else(|| defaults.api_url.clone()),
		join_params_to_url: overrides.join_params_to_url.unwrap_or(defaults.join_params_to_url),
		format_date: overrides.format_date.unwrap_or(defaults.format_date),
		is_transform_response: overrides
			.is_transform_response
			.unwrap_or(defaults.is_transform_response),
		is_return_native_response: overrides
			.is_return_native_response
			.unwrap_or(defaults.is_return_native_response),
		join_time: overrides.join_time.unwrap_or(defaults.join_time),
		with_token: overrides.with_token.unwrap_or(defaults.with_token),
		retry: overrides.retry.unwrap_or(defaults.retry),
		authentication_header: overrides
			.authentication_header
			.clone()
			.unwrap_or_else(|| defaults.authentication_header.clone()),
		authentication_scheme,
		error_message_mode: overrides.error_message_mode.unwrap_or(defaults.error_message_mode),
		content_type: overrides.content_type.unwrap_or(defaults.content_type),
		timeout_ms: overrides.timeout_ms.unwrap_or(defaults.timeout_ms),
	}
}

/// Shape of the uniform response envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvelopeConfig {
	/// Field holding the payload.
	pub result_field: String,
	/// Field holding the human-readable message.
	pub message_field: String,
	/// Field holding the business error code.
	pub code_field: String,
	/// Code that marks success.
	pub success_code: i64,
	/// Code that marks an expired credential, if the backend uses one.
	pub auth_expired_code: Option<i64>,
}
impl Default for EnvelopeConfig {
	fn default() -> Self {
		Self {
			result_field: "result".into(),
			message_field: "message".into(),
			code_field: "errorCode".into(),
			success_code: 0,
			auth_expired_code: Some(11),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn merge_is_per_key() {
		let defaults = RequestOptions {
			url_prefix: Some("/api".into()),
			api_url: Some("https://tb.example.com".into()),
			..RequestOptions::default()
		};
		let merged = merge(&defaults, &RequestOverrides::none().with_token(false));

		assert!(!merged.with_token);
		assert_eq!(merged.url_prefix.as_deref(), Some("/api"));
		assert_eq!(merged.api_url.as_deref(), Some("https://tb.example.com"));
		assert_eq!(merged.authentication_header, "Authorization");
		assert_eq!(merge(&defaults, &RequestOverrides::none()), defaults);
	}

	#[test]
	fn empty_scheme_override_removes_the_scheme() {
		let overrides = RequestOverrides {
			authentication_header: Some("X-Api-Key".into()),
			authentication_scheme: Some(String::new()),
			..RequestOverrides::default()
		};
		let merged = merge(&RequestOptions::default(), &overrides);

		assert_eq!(merged.authentication_header, "X-Api-Key");
		assert_eq!(merged.authentication_scheme, None);
	}

	#[test]
	fn overrides_ignore_unknown_keys() {
		let overrides: RequestOverrides = serde_json::from_str(
			r#"{"withToken":false,"errorMessageMode":"modal","ignoreCancelToken":true}"#,
		)
		.expect("Overrides with unknown keys should deserialize.");

		assert_eq!(overrides.with_token, Some(false));
		assert_eq!(overrides.error_message_mode, Some(ErrorMessageMode::Modal));
		assert_eq!(overrides.join_time, None);
	}

	#[test]
	fn options_deserialize_with_defaults() {
		let options: RequestOptions =
			serde_json::from_str(r#"{"joinTime":false,"retry":{"count":3}}"#)
				.expect("Partial options should deserialize.");

		assert!(!options.join_time);
		assert!(options.with_token);
		assert_eq!(options.retry, RetryPolicy { count: 3, wait_ms: 100 });
		assert_eq!(options.timeout(), Some(Duration::from_millis(10_000)));
	}

	#[test]
	fn backoff_stays_within_jitter_bounds() {
		let policy = RetryPolicy { count: 2, wait_ms: 100 };

		for attempt in 1..=5 {
			let wait = policy.backoff(attempt);
			let floor = 100 * u64::from(attempt);

			assert!(wait >= Duration::from_millis(floor));
			assert!(wait <= Duration::from_millis(floor + 50));
		}
	}
}
