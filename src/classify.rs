//! Failure classification and the user-facing message policy.
//!
//! Transports report [`TransportError`] values and raw non-2xx responses; this module maps
//! both onto the pipeline's [`Error`] taxonomy. Only [`Error::AuthExpired`] is later
//! recovered (by the refresh coordinator); every other kind is surfaced as-is.

// self
use crate::{
	_prelude::*,
	error::{ErrorKind, MalformedError, TransportError},
	http::HttpResponse,
	options::EnvelopeConfig,
};

/// Maps a transport failure (no usable response) onto the pipeline taxonomy.
pub fn transport_error(err: TransportError) -> Error {
	match err {
		TransportError::Timeout => Error::Timeout,
		TransportError::Body { .. } =>
			Error::MalformedResponse { status: None, source: MalformedError::Body(err) },
		TransportError::Network { .. } | TransportError::Io(_) =>
			Error::NetworkUnreachable { source: err },
	}
}

/// Classifies a response whose status is outside the 2xx range.
///
/// HTTP 401 and an envelope carrying the configured "authentication expired" code are
/// treated as equivalent [`Error::AuthExpired`] signals; anything else becomes
/// [`Error::HttpStatus`] with the envelope message attached when one is present.
pub fn status_error(response: &HttpResponse, envelope: &EnvelopeConfig) -> Error {
	let body = serde_json::from_slice::<Value>(&response.body).ok();
	let code =
		body.as_ref().and_then(|value| value.get(&envelope.code_field)).and_then(Value::as_i64);

	if response.status == 401 || (code.is_some() && code == envelope.auth_expired_code) {
		return Error::AuthExpired;
	}

	let message = body
		.as_ref()
		.and_then(|value| value.get(&envelope.message_field))
		.and_then(Value::as_str)
		.map(str::to_owned);

	Error::HttpStatus { status: response.status, message }
}

/// Returns the pre-defined message for a well-known HTTP status.
pub fn status_message(status: u16) -> &'static str {
	match status {
		400 => "The request was rejected as invalid.",
		401 => "Your session has expired, please log in again.",
		403 => "You are signed in but not allowed to access this resource.",
		404 => "The requested resource was not found.",
		405 => "The request method is not allowed.",
		408 => "The server timed out waiting for the request.",
		500 => "Internal server error, please contact the administrator.",
		501 => "The server does not support this request.",
		502 => "Bad gateway, please try again later.",
		503 => "The service is unavailable, the server may be overloaded or under maintenance.",
		504 => "Gateway timeout, please try again later.",
		505 => "The HTTP version of the request is not supported.",
		_ => "The request failed with an unexpected status.",
	}
}

/// Returns the pre-defined message for an error kind.
pub fn kind_message(kind: ErrorKind) -> &'static str {
	match kind {
		ErrorKind::Config => "The request could not be prepared.",
		ErrorKind::Timeout => "The network request timed out, please retry.",
		ErrorKind::NetworkUnreachable =>
			"Network exception, please check that your connection is working.",
		ErrorKind::MalformedResponse | ErrorKind::HttpStatus =>
			"The request failed, please try again later.",
		ErrorKind::AuthExpired | ErrorKind::RefreshFailed =>
			"Your session has expired, please log in again.",
		ErrorKind::Business => "The request could not be completed.",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::Headers;

	fn response(status: u16, body: &str) -> HttpResponse {
		HttpResponse { status, headers: Headers::new(), body: body.as_bytes().to_vec() }
	}

	#[test]
	fn unauthorized_status_is_auth_expired() {
		let err = status_error(&response(401, ""), &EnvelopeConfig::default());

		assert!(matches!(err, Error::AuthExpired));
	}

	#[test]
	fn envelope_sentinel_is_auth_expired_on_any_status() {
		let err = status_error(
			&response(403, r#"{"errorCode":11,"message":"Token has expired"}"#),
			&EnvelopeConfig::default(),
		);

		assert!(matches!(err, Error::AuthExpired));
	}

	#[test]
	fn other_statuses_keep_the_envelope_message() {
		let err = status_error(
			&response(404, r#"{"errorCode":32,"message":"Device not found"}"#),
			&EnvelopeConfig::default(),
		);

		match err {
			Error::HttpStatus { status, message } => {
				assert_eq!(status, 404);
				assert_eq!(message.as_deref(), Some("Device not found"));
			},
			other => panic!("Unexpected classification: {other:?}."),
		}
	}

	#[test]
	fn well_known_statuses_have_distinct_messages() {
		let codes = [400, 403, 404, 408, 500, 502, 503, 504];
		let mut messages = codes.iter().map(|code| status_message(*code)).collect::<Vec<_>>();

		messages.sort_unstable();
		messages.dedup();

		assert_eq!(messages.len(), codes.len());
		assert_eq!(status_message(418), status_message(599));
		assert!(!codes.iter().any(|code| status_message(*code) == status_message(418)));
	}

	#[test]
	fn transport_failures_map_to_kinds() {
		assert!(matches!(transport_error(TransportError::Timeout), Error::Timeout));
		assert!(matches!(
			transport_error(TransportError::Io(std::io::Error::other("refused"))),
			Error::NetworkUnreachable { .. }
		));
		assert!(matches!(
			transport_error(TransportError::body(std::io::Error::other("truncated"))),
			Error::MalformedResponse { .. }
		));
	}
}
