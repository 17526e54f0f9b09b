//! Pre-send and post-receive hooks.
//!
//! [`prepare`] composes the pre-send hooks (URL building, parameter placement, payload
//! normalization, body encoding) into one [`PreparedRequest`]. The prepared request is built
//! once per logical request and shared by every attempt, retry, and replay; only the
//! credential header is recomputed per attempt.

pub mod credential;
pub mod payload;
pub mod response;
pub mod url_builder;

pub use payload::{DatePredicate, PayloadNormalizer, Rfc3339Dates};
pub use response::{Reply, ResponseTransformer};

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{Headers, WireRequest},
	options::{ContentType, RequestOptions},
	request::{Method, ParamMap, ParamValue, RequestDescriptor},
};

/// Request with URL, parameters, and body fully resolved, but no credential attached.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL with the query already serialized.
	pub url: Url,
	/// Caller headers plus `Content-Type` when a body is present.
	pub headers: Headers,
	/// Encoded body.
	pub body: Option<Vec<u8>>,
}
impl PreparedRequest {
	/// Builds a wire request carrying `headers` in place of the prepared ones.
	pub fn to_wire(&self, headers: Headers, timeout: Option<Duration>) -> WireRequest {
		WireRequest {
			method: self.method,
			url: self.url.clone(),
			headers,
			body: self.body.clone(),
			timeout,
		}
	}
}

/// Runs the pre-send hooks for `descriptor` under `options`.
///
/// - GET: parameters go to the query and a cache-busting timestamp is added when `join_time`
///   is on; any body is dropped.
/// - Other methods: parameters become the body when no body is given and
///   `join_params_to_url` is off; otherwise they go to the query. Either way they pass through
///   the normalizer when `format_date` is on.
/// - `force_json` encodes the body as JSON and overrides any caller `Content-Type`.
pub fn prepare(
	method: Method,
	descriptor: &RequestDescriptor,
	options: &RequestOptions,
	normalizer: &PayloadNormalizer,
	force_json: bool,
) -> Result<PreparedRequest> {
	let mut url = url_builder::resolve(&descriptor.url, options)?;
	let mut params = descriptor.params.clone();
	let mut headers = descriptor.headers.clone();
	let mut body = None;

	if method.is_get_like() {
		if options.join_time {
			params.insert(
				url_builder::TIMESTAMP_PARAM.into(),
				ParamValue::from(url_builder::cache_buster()),
			);
		}
	} else if let Some(payload) = &descriptor.body {
		body = Some(payload.clone());
	} else if !options.join_params_to_url && !params.is_empty() {
		body = Some(params_object(&params));

		params.clear();
	}
	if !method.is_get_like() && options.format_date && !params.is_empty() {
		params = normalize_params(&params, normalizer);
	}

	url_builder::append_params(&mut url, &params);

	let body = match body {
		Some(payload) => {
			let payload =
				if options.format_date { normalizer.normalize(&payload) } else { payload };
			let content_type = if force_json { ContentType::Json } else { options.content_type };

			if force_json || !headers.contains("Content-Type") {
				headers.insert("Content-Type", content_type.header_value());
			}

			Some(encode_body(&payload, content_type)?)
		},
		None => None,
	};

	Ok(PreparedRequest { method, url, headers, body })
}

fn params_object(params: &ParamMap) -> Value {
	Value::Object(params.iter().map(|(key, value)| (key.clone(), value.to_json())).collect())
}

fn normalize_params(params: &ParamMap, normalizer: &PayloadNormalizer) -> ParamMap {
	match normalizer.normalize(&params_object(params)) {
		Value::Object(map) => map
			.into_iter()
			.filter_map(|(key, value)| ParamValue::from_json(value).map(|value| (key, value)))
			.collect(),
		_ => params.clone(),
	}
}

fn encode_body(payload: &Value, content_type: ContentType) -> Result<Vec<u8>, ConfigError> {
	match (content_type, payload) {
		(ContentType::FormUrlEncoded, Value::Object(map)) => {
			let mut form = url::form_urlencoded::Serializer::new(String::new());

			for (key, value) in map {
				match value {
					Value::Null => continue,
					Value::String(text) => form.append_pair(key, text),
					other => form.append_pair(key, &other.to_string()),
				};
			}

			Ok(form.finish().into_bytes())
		},
		_ => Ok(serde_json::to_vec(payload)?),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn options() -> RequestOptions {
		RequestOptions {
			url_prefix: Some("/api".into()),
			api_url: Some("https://tb.example.com".into()),
			..RequestOptions::default()
		}
	}

	fn run(
		method: Method,
		descriptor: &RequestDescriptor,
		options: &RequestOptions,
	) -> PreparedRequest {
		prepare(method, descriptor, options, &PayloadNormalizer::new(), false)
			.expect("Descriptor should prepare.")
	}

	#[test]
	fn get_params_and_timestamp_go_to_the_query() {
		let descriptor = RequestDescriptor::get("/tenant/devices").param("pageSize", 10);
		let prepared = run(Method::Get, &descriptor, &options());
		let keys = prepared.url.query_pairs().map(|(key, _)| key.into_owned()).collect::<Vec<_>>();

		assert_eq!(prepared.url.path(), "/api/tenant/devices");
		assert_eq!(keys, ["_t", "pageSize"]);
		assert_eq!(prepared.body, None);

		let no_time = RequestOptions { join_time: false, ..options() };
		let prepared = run(Method::Get, &descriptor, &no_time);

		assert_eq!(prepared.url.query(), Some("pageSize=10"));
	}

	#[test]
	fn bodiless_post_sends_params_as_json_body() {
		let descriptor = RequestDescriptor::post("/auth/login")
			.param("username", " tenant@example.com ")
			.param("password", "secret");
		let prepared = run(Method::Post, &descriptor, &options());
		let body: Value = serde_json::from_slice(prepared.body.as_deref().expect("Body expected."))
			.expect("Body should be JSON.");

		assert_eq!(prepared.url.query(), None);
		assert_eq!(body, json!({ "username": "tenant@example.com", "password": "secret" }));
		assert_eq!(
			prepared.headers.get("content-type"),
			Some(ContentType::Json.header_value())
		);
	}

	#[test]
	fn join_params_to_url_keeps_params_in_the_query() {
		let descriptor = RequestDescriptor::post("/device").param("accessToken", "abc");
		let options = RequestOptions { join_params_to_url: true, ..options() };
		let prepared = run(Method::Post, &descriptor, &options);

		assert_eq!(prepared.url.query(), Some("accessToken=abc"));
		assert_eq!(prepared.body, None);
	}

	#[test]
	fn form_encoding_and_forced_json() {
		let descriptor = RequestDescriptor::post("/oauth/token")
			.body(json!({ "grant": "refresh", "count": 2, "skip": null }))
			.header("Content-Type", "text/plain");
		let form = RequestOptions { content_type: ContentType::FormUrlEncoded, ..options() };
		let prepared = run(Method::Post, &descriptor, &form);

		let pairs = url::form_urlencoded::parse(prepared.body.as_deref().expect("Body expected."))
			.into_owned()
			.collect::<BTreeMap<_, _>>();

		assert_eq!(pairs.len(), 2);
		assert_eq!(pairs["count"], "2");
		assert_eq!(pairs["grant"], "refresh");
		assert_eq!(prepared.headers.get("Content-Type"), Some("text/plain"));

		let forced = prepare(Method::Post, &descriptor, &form, &PayloadNormalizer::new(), true)
			.expect("Descriptor should prepare.");

		assert_eq!(forced.headers.get("Content-Type"), Some(ContentType::Json.header_value()));
		assert!(forced.body.as_deref().is_some_and(|body| body.starts_with(b"{")));
	}

	#[test]
	fn dates_are_formatted_only_when_enabled() {
		let descriptor =
			RequestDescriptor::post("/alarm").body(json!({ "startTs": "2024-03-05T08:09:10Z" }));
		let prepared = run(Method::Post, &descriptor, &options());

		assert_eq!(prepared.body.as_deref(), Some(br#"{"startTs":"2024-03-05 08:09"}"#.as_slice()));

		let raw = RequestOptions { format_date: false, ..options() };
		let prepared = run(Method::Post, &descriptor, &raw);

		assert_eq!(
			prepared.body.as_deref(),
			Some(br#"{"startTs":"2024-03-05T08:09:10Z"}"#.as_slice())
		);
	}

	#[test]
	fn query_params_of_bodied_requests_are_normalized() {
		let descriptor = RequestDescriptor::post("/alarm")
			.param("since", "2024-03-05T08:09:10Z")
			.param("textSearch", " pump ")
			.body(json!({ "ack": true }));
		let prepared = run(Method::Post, &descriptor, &options());
		let pairs = prepared.url.query_pairs().into_owned().collect::<BTreeMap<_, _>>();

		assert_eq!(pairs["since"], "2024-03-05 08:09");
		assert_eq!(pairs["textSearch"], "pump");
		assert_eq!(prepared.body.as_deref(), Some(br#"{"ack":true}"#.as_slice()));

		let raw = RequestOptions { format_date: false, ..options() };
		let prepared = run(Method::Post, &descriptor, &raw);
		let pairs = prepared.url.query_pairs().into_owned().collect::<BTreeMap<_, _>>();

		assert_eq!(pairs["textSearch"], " pump ");
	}

	#[test]
	fn descriptor_is_not_mutated() {
		let descriptor = RequestDescriptor::post("/auth/login").param("username", " a ");
		let snapshot = descriptor.clone();
		let _ = run(Method::Post, &descriptor, &options());

		assert_eq!(descriptor.params, snapshot.params);
		assert_eq!(descriptor.body, snapshot.body);
		assert_eq!(descriptor.headers, snapshot.headers);
	}
}
