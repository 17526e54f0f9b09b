//! Pipeline-level error types shared across hooks, transports, and the refresh coordinator.

// std
use std::borrow::Cow;
// self
use crate::{_prelude::*, classify};

/// Pipeline-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical pipeline error exposed by public APIs.
///
/// Every variant maps to one [`ErrorKind`] and a pre-defined user-facing message (see
/// [`Error::user_message`]); the underlying cause stays reachable through
/// [`std::error::Error::source`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Transport gave up waiting for the server.
	#[error("Request timed out before the server responded.")]
	Timeout,
	/// No response was received at all (DNS, refused connection, offline).
	#[error("Network is unreachable.")]
	NetworkUnreachable {
		/// Transport-specific failure.
		#[source]
		source: TransportError,
	},
	/// Transport succeeded but the body matches none of the expected shapes.
	#[error("Server returned a malformed response.")]
	MalformedResponse {
		/// HTTP status of the offending response, when one was received.
		status: Option<u16>,
		/// Structured parsing failure.
		#[source]
		source: MalformedError,
	},
	/// Server answered with a non-2xx status.
	#[error("Server responded with HTTP status {status}.")]
	HttpStatus {
		/// HTTP status code.
		status: u16,
		/// Message carried by the response envelope, if any.
		message: Option<String>,
	},
	/// Credential expired; recoverable through one refresh cycle.
	#[error("Access credential has expired.")]
	AuthExpired,
	/// Terminal form of [`Error::AuthExpired`] after a failed renewal.
	#[error("Credential refresh failed: {reason}")]
	RefreshFailed {
		/// Human-readable summary of the renewal failure.
		reason: String,
		/// Error raised by the renewal attempt, shared by every request of the cycle.
		#[source]
		source: Option<Arc<Error>>,
	},
	/// Envelope-level failure unrelated to authentication.
	#[error("Server reported business error {error_code}: {message}.")]
	Business {
		/// Envelope error code.
		error_code: i64,
		/// Envelope message.
		message: String,
	},
}
impl Error {
	/// Returns the classification label of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(_) => ErrorKind::Config,
			Self::Timeout => ErrorKind::Timeout,
			Self::NetworkUnreachable { .. } => ErrorKind::NetworkUnreachable,
			Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
			Self::HttpStatus { .. } => ErrorKind::HttpStatus,
			Self::AuthExpired => ErrorKind::AuthExpired,
			Self::RefreshFailed { .. } => ErrorKind::RefreshFailed,
			Self::Business { .. } => ErrorKind::Business,
		}
	}

	/// Returns the message shown to end users.
	///
	/// Messages are pre-defined per kind (and per HTTP status); transport exception text is
	/// never surfaced. Business errors carry the server's own message.
	pub fn user_message(&self) -> Cow<'static, str> {
		match self {
			Self::Business { message, .. } if !message.trim().is_empty() =>
				Cow::Owned(message.clone()),
			Self::HttpStatus { status, .. } => Cow::Borrowed(classify::status_message(*status)),
			_ => Cow::Borrowed(classify::kind_message(self.kind())),
		}
	}

	/// Returns `true` for failures that may succeed when the same request is sent again.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Timeout | Self::NetworkUnreachable { .. } => true,
			Self::HttpStatus { status, .. } => matches!(status, 502..=504),
			_ => false,
		}
	}

	pub(crate) fn refresh_failed(cause: Arc<Error>) -> Self {
		Self::RefreshFailed { reason: cause.to_string(), source: Some(cause) }
	}
}

/// Stable classification labels for [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
	/// Local configuration problem.
	Config,
	/// Transport timeout or abort.
	Timeout,
	/// No response object at all.
	NetworkUnreachable,
	/// Unparseable or unexpected body.
	MalformedResponse,
	/// Non-2xx HTTP status.
	HttpStatus,
	/// Expired credential.
	AuthExpired,
	/// Credential renewal failed.
	RefreshFailed,
	/// Envelope business failure.
	Business,
}
impl ErrorKind {
	/// Returns a stable label suitable for logs, spans, or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Config => "config",
			Self::Timeout => "timeout",
			Self::NetworkUnreachable => "network_unreachable",
			Self::MalformedResponse => "malformed_response",
			Self::HttpStatus => "http_status",
			Self::AuthExpired => "auth_expired",
			Self::RefreshFailed => "refresh_failed",
			Self::Business => "business",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised by the pipeline.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Neither the request nor the client supplied an absolute base URL.
	#[error("Request path `{path}` is relative and no API URL is configured.")]
	MissingBaseUrl {
		/// Path that could not be resolved.
		path: String,
	},
	/// The joined URL could not be parsed.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Joined URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodyEncode(#[from] serde_json::Error),
	/// Wire date format description is invalid.
	#[error("Date format description is invalid.")]
	InvalidDateFormat(#[from] time::error::InvalidFormatDescription),

	/// No refresh endpoint was configured, so expired credentials cannot be renewed.
	#[error("No refresh endpoint is configured.")]
	MissingRefreshEndpoint,
	/// Credential store holds no refresh token.
	#[error("Credential store is missing a refresh token.")]
	MissingRefreshToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Reasons a response body was rejected as malformed.
#[derive(Debug, ThisError)]
pub enum MalformedError {
	/// Body is not valid JSON.
	#[error("Response body is not valid JSON.")]
	Json(#[from] serde_json::Error),
	/// Body is JSON but does not match the requested shape.
	#[error("Response body does not match the expected shape.")]
	Shape(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Envelope is not a JSON object.
	#[error("Response envelope is not a JSON object.")]
	NotAnEnvelope,
	/// Envelope lacks the result field.
	#[error("Response envelope is missing the `{field}` field.")]
	MissingResult {
		/// Configured result field name.
		field: String,
	},
	/// Envelope code is not an integer.
	#[error("Response envelope field `{field}` is not an integer.")]
	InvalidCode {
		/// Configured code field name.
		field: String,
	},
	/// Body could not be read off the wire.
	#[error("Response body could not be read.")]
	Body(#[source] TransportError),
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Transport aborted the request after its timeout elapsed.
	#[error("Request timed out in the transport.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
	/// Response headers arrived but the body could not be read.
	#[error("Response body could not be read.")]
	Body {
		/// Transport-specific body error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific body error.
	pub fn body(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Body { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout
		} else if e.is_body() || e.is_decode() {
			Self::body(e)
		} else {
			Self::network(e)
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn refresh_failure_exposes_the_shared_cause() {
		let cause = Arc::new(Error::from(ConfigError::MissingRefreshToken));
		let err = Error::refresh_failed(cause.clone());

		assert_eq!(err.kind(), ErrorKind::RefreshFailed);
		assert!(err.to_string().contains("missing a refresh token"));

		let source = StdError::source(&err).expect("Refresh failure should expose its cause.");

		assert_eq!(source.to_string(), cause.to_string());
	}

	#[test]
	fn user_messages_never_leak_transport_text() {
		let err = Error::NetworkUnreachable {
			source: TransportError::Io(std::io::Error::other("ECONNREFUSED 10.0.0.1:443")),
		};

		assert!(!err.user_message().contains("ECONNREFUSED"));
		assert_eq!(err.user_message(), classify::kind_message(ErrorKind::NetworkUnreachable));
	}

	#[test]
	fn business_errors_show_the_server_message() {
		let err = Error::Business { error_code: 31, message: "Device name already exists".into() };

		assert_eq!(err.user_message(), "Device name already exists");

		let blank = Error::Business { error_code: 31, message: "  ".into() };

		assert_eq!(blank.user_message(), classify::kind_message(ErrorKind::Business));
	}

	#[test]
	fn transient_classification_covers_gateway_statuses() {
		assert!(Error::Timeout.is_transient());
		assert!(Error::HttpStatus { status: 503, message: None }.is_transient());
		assert!(!Error::HttpStatus { status: 500, message: None }.is_transient());
		assert!(!Error::AuthExpired.is_transient());
	}
}
