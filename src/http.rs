//! Transport primitives for the request pipeline.
//!
//! The module exposes [`HttpTransport`] alongside the wire-level [`WireRequest`] and
//! [`HttpResponse`] types so downstream crates can plug in any HTTP stack. The pipeline
//! never talks to the network directly: every attempt, replay, and refresh call goes through
//! [`HttpTransport::send`].

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError, request::Method};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing one request.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// every clone of a client. Cancellation is expressed by dropping the returned future;
/// transports must not keep working on a request once its future is gone.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with whatever response the server produced.
	///
	/// Non-2xx statuses are successful transport outcomes; only failures that leave no
	/// usable response (timeouts, network errors, unreadable bodies) are errors.
	fn send(&self, request: WireRequest) -> TransportFuture<'_>;
}

/// Ordered, case-insensitive header list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);
impl Headers {
	/// Creates an empty header list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the first value stored under `name`, compared case-insensitively.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns `true` when a header named `name` exists.
	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// Replaces every value stored under `name` with `value`.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();

		self.remove(&name);
		self.0.push((name, value.into()));
	}

	/// Removes every value stored under `name`.
	pub fn remove(&mut self, name: &str) {
		self.0.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
	}

	/// Iterates over `(name, value)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
	}

	/// Returns the number of stored headers.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no headers are stored.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl<K, V> FromIterator<(K, V)> for Headers
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut headers = Self::new();

		for (name, value) in iter {
			headers.insert(name, value);
		}

		headers
	}
}

/// Fully prepared request handed to a transport.
#[derive(Clone, Debug)]
pub struct WireRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL, query included.
	pub url: Url,
	/// Outgoing headers, credential included.
	pub headers: Headers,
	/// Encoded body, if any.
	pub body: Option<Vec<u8>>,
	/// Per-request timeout hint; the pipeline enforces it independently as well.
	pub timeout: Option<Duration>,
}

/// Response exactly as received from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: Headers,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Builds a JSON response with the provided status.
	pub fn json(status: u16, body: &Value) -> Self {
		let mut headers = Headers::new();

		headers.insert("content-type", "application/json");

		Self { status, headers, body: body.to_string().into_bytes() }
	}

	/// Returns `true` when the status lies in the 2xx range.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: WireRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(reqwest_method(request.method), request.url);

			for (name, value) in request.headers.iter() {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::body)?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Patch => reqwest::Method::PATCH,
		Method::Delete => reqwest::Method::DELETE,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn headers_are_case_insensitive_and_replace() {
		let mut headers = Headers::new();

		headers.insert("X-Authorization", "Bearer a");
		headers.insert("x-authorization", "Bearer b");

		assert_eq!(headers.len(), 1);
		assert_eq!(headers.get("X-AUTHORIZATION"), Some("Bearer b"));

		headers.remove("X-Authorization");

		assert!(headers.is_empty());
	}

	#[test]
	fn json_response_helper_sets_content_type() {
		let response = HttpResponse::json(200, &serde_json::json!({ "ok": true }));

		assert!(response.is_success());
		assert_eq!(response.headers.get("Content-Type"), Some("application/json"));
		assert_eq!(response.body, br#"{"ok":true}"#.to_vec());
	}
}
