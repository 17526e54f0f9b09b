//! Response unwrapping.
//!
//! [`ResponseTransformer::transform`] turns a raw [`HttpResponse`] into a [`Reply`]. The
//! evaluation order is fixed: non-2xx statuses are classified first, then the native-response
//! bypass applies, then any rotated token is harvested, and finally the payload is returned
//! raw or unwrapped from the `{errorCode, message, result}` envelope.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	classify,
	error::MalformedError,
	hooks::credential,
	http::HttpResponse,
	options::{EnvelopeConfig, RequestOptions},
	store::CredentialStore,
};

/// Successful outcome of one logical request.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
	/// Transport response returned untouched.
	Native(HttpResponse),
	/// Unwrapped (or raw) JSON payload.
	Data(Value),
}
impl Reply {
	/// Borrows the JSON payload, if this is a data reply.
	pub fn data(&self) -> Option<&Value> {
		match self {
			Self::Data(value) => Some(value),
			Self::Native(_) => None,
		}
	}

	/// Takes the JSON payload, if this is a data reply.
	pub fn into_data(self) -> Option<Value> {
		match self {
			Self::Data(value) => Some(value),
			Self::Native(_) => None,
		}
	}

	/// Takes the transport response, if this is a native reply.
	pub fn into_native(self) -> Option<HttpResponse> {
		match self {
			Self::Native(response) => Some(response),
			Self::Data(_) => None,
		}
	}

	/// Deserializes the reply into `T`, reporting the failing path on shape mismatches.
	pub fn deserialize<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		match self {
			Self::Data(value) => serde_path_to_error::deserialize(value).map_err(|e| {
				Error::MalformedResponse { status: None, source: MalformedError::Shape(e) }
			}),
			Self::Native(response) => {
				let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

				serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
					Error::MalformedResponse {
						status: Some(response.status),
						source: MalformedError::Shape(e),
					}
				})
			},
		}
	}
}

/// Post-receive hook: classification, bypass, token rotation, and envelope unwrapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseTransformer {
	envelope: EnvelopeConfig,
	rotated_token_header: Option<String>,
}
impl ResponseTransformer {
	/// Creates a transformer for the given envelope shape.
	pub fn new(envelope: EnvelopeConfig) -> Self {
		Self { envelope, rotated_token_header: None }
	}

	/// Harvests a rotated access token from response header `name`.
	pub fn with_rotated_token_header(mut self, name: impl Into<String>) -> Self {
		self.rotated_token_header = Some(name.into());

		self
	}

	/// Returns the envelope shape in use.
	pub fn envelope(&self) -> &EnvelopeConfig {
		&self.envelope
	}

	/// Converts `response` into a [`Reply`] or a classified [`Error`].
	pub fn transform(
		&self,
		response: HttpResponse,
		options: &RequestOptions,
		store: &dyn CredentialStore,
	) -> Result<Reply> {
		if !response.is_success() {
			return Err(classify::status_error(&response, &self.envelope));
		}
		if options.is_return_native_response {
			return Ok(Reply::Native(response));
		}

		self.harvest_rotated_token(&response, options, store);

		if response.body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Reply::Data(Value::Null));
		}

		let status = Some(response.status);
		let payload = serde_json::from_slice::<Value>(&response.body)
			.map_err(|e| Error::MalformedResponse { status, source: MalformedError::Json(e) })?;

		if !options.is_transform_response {
			return Ok(Reply::Data(payload));
		}

		unwrap_envelope(&self.envelope, response.status, payload).map(Reply::Data)
	}

	fn harvest_rotated_token(
		&self,
		response: &HttpResponse,
		options: &RequestOptions,
		store: &dyn CredentialStore,
	) {
		let header = self.rotated_token_header.as_deref();
		let Some(value) = header.and_then(|name| response.headers.get(name)) else {
			return;
		};
		let token = credential::strip_scheme(value, options.authentication_scheme.as_deref());

		if !token.is_empty() {
			store.set_access_token(TokenSecret::new(token));
		}
	}
}

/// Unwraps the `result` field of an envelope, classifying non-success codes.
///
/// A missing or `null` code counts as success. The configured "authentication expired" code
/// becomes [`Error::AuthExpired`]; any other code becomes [`Error::Business`].
pub(crate) fn unwrap_envelope(
	config: &EnvelopeConfig,
	status: u16,
	payload: Value,
) -> Result<Value> {
	let malformed = |source| Error::MalformedResponse { status: Some(status), source };
	let Value::Object(mut envelope) = payload else {
		return Err(malformed(MalformedError::NotAnEnvelope));
	};
	let code = match envelope.get(&config.code_field) {
		None | Some(Value::Null) => config.success_code,
		Some(value) => value.as_i64().ok_or_else(|| {
			malformed(MalformedError::InvalidCode { field: config.code_field.clone() })
		})?,
	};

	if code != config.success_code {
		if Some(code) == config.auth_expired_code {
			return Err(Error::AuthExpired);
		}

		let message = envelope
			.get(&config.message_field)
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_owned();

		return Err(Error::Business { error_code: code, message });
	}

	envelope.remove(&config.result_field).ok_or_else(|| {
		malformed(MalformedError::MissingResult { field: config.result_field.clone() })
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		auth::CredentialPair,
		http::Headers,
		store::MemoryCredentialStore,
	};

	fn transform(response: HttpResponse, options: &RequestOptions) -> Result<Reply> {
		let store = MemoryCredentialStore::default();

		ResponseTransformer::default().transform(response, options, &store)
	}

	#[test]
	fn envelope_result_is_unwrapped() {
		let reply = transform(
			HttpResponse::json(
				200,
				&json!({ "errorCode": 0, "message": "ok", "result": { "id": 7 } }),
			),
			&RequestOptions::default(),
		)
		.expect("Successful envelope should unwrap.");

		assert_eq!(reply, Reply::Data(json!({ "id": 7 })));
	}

	#[test]
	fn native_bypass_skips_envelope_parsing() {
		let response = HttpResponse::json(200, &json!({ "errorCode": 99 }));
		let options =
			RequestOptions { is_return_native_response: true, ..RequestOptions::default() };
		let reply = transform(response.clone(), &options).expect("Native bypass should succeed.");

		assert_eq!(reply.into_native(), Some(response));
	}

	#[test]
	fn raw_mode_returns_the_payload() {
		let options = RequestOptions { is_transform_response: false, ..RequestOptions::default() };
		let reply = transform(HttpResponse::json(200, &json!([1, 2, 3])), &options)
			.expect("Raw payload should be returned.");

		assert_eq!(reply.into_data(), Some(json!([1, 2, 3])));
	}

	#[test]
	fn envelope_codes_are_classified() {
		let options = RequestOptions::default();
		let expired = transform(
			HttpResponse::json(200, &json!({ "errorCode": 11, "message": "Token has expired" })),
			&options,
		)
		.expect_err("Auth sentinel should fail.");

		assert!(matches!(expired, Error::AuthExpired));

		let business = transform(
			HttpResponse::json(200, &json!({ "errorCode": 31, "message": "Name taken" })),
			&options,
		)
		.expect_err("Business code should fail.");

		assert!(matches!(
			business,
			Error::Business { error_code: 31, ref message } if message == "Name taken"
		));
	}

	#[test]
	fn malformed_bodies_are_reported() {
		let options = RequestOptions::default();
		let missing = transform(HttpResponse::json(200, &json!({ "errorCode": 0 })), &options)
			.expect_err("Missing result should fail.");

		assert!(matches!(
			missing,
			Error::MalformedResponse { source: MalformedError::MissingResult { .. }, .. }
		));

		let not_json = transform(
			HttpResponse { status: 200, headers: Headers::new(), body: b"<html>".to_vec() },
			&options,
		)
		.expect_err("HTML should fail.");

		assert!(matches!(not_json, Error::MalformedResponse { status: Some(200), .. }));
	}

	#[test]
	fn empty_body_is_null() {
		let reply = transform(
			HttpResponse { status: 204, headers: Headers::new(), body: Vec::new() },
			&RequestOptions::default(),
		)
		.expect("Empty body should succeed.");

		assert_eq!(reply, Reply::Data(Value::Null));
	}

	#[test]
	fn non_success_statuses_are_classified_even_in_native_mode() {
		let options =
			RequestOptions { is_return_native_response: true, ..RequestOptions::default() };
		let err = transform(HttpResponse::json(401, &json!({})), &options)
			.expect_err("401 should be classified.");

		assert!(matches!(err, Error::AuthExpired));
	}

	#[test]
	fn rotated_tokens_are_harvested() {
		let store = MemoryCredentialStore::new(CredentialPair::new("access-1", "refresh-1"));
		let transformer =
			ResponseTransformer::default().with_rotated_token_header("X-Rotated-Token");
		let mut response = HttpResponse::json(200, &json!({ "errorCode": 0, "result": null }));

		response.headers.insert("x-rotated-token", "Bearer access-2");
		transformer
			.transform(response, &RequestOptions::default(), &store)
			.expect("Envelope should unwrap.");

		assert_eq!(store.access_token().as_ref().map(TokenSecret::expose), Some("access-2"));
	}

	#[test]
	fn replies_deserialize_with_paths() {
		#[derive(Debug, Deserialize)]
		struct Device {
			#[allow(dead_code)]
			id: u64,
		}

		let err = Reply::Data(json!({ "id": "seven" }))
			.deserialize::<Device>()
			.expect_err("String id should not deserialize.");

		match err {
			Error::MalformedResponse { source: MalformedError::Shape(shape), .. } =>
				assert_eq!(shape.path().to_string(), "id"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}
}
