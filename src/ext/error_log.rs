//! Diagnostic sink for failed requests.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, error::ErrorKind, request::Method};

/// Receives one entry per failed logical request.
pub trait ErrorLog
where
	Self: Send + Sync,
{
	/// Records a failure.
	fn record(&self, entry: ErrorLogEntry);
}

/// Diagnostic record of a failed request.
///
/// Unlike the user-facing message, `detail` carries the full error chain, transport text
/// included, and is meant for internal logs only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
	/// Classification of the failure.
	pub kind: ErrorKind,
	/// Message that was (or would have been) shown to the user.
	pub message: String,
	/// Error chain rendered for diagnostics.
	pub detail: String,
	/// HTTP method of the failed request.
	pub method: Method,
	/// Request URL, or the unresolved path when URL resolution itself failed.
	pub url: String,
	/// HTTP status, when a response was received.
	pub status: Option<u16>,
	/// Instant the failure was reported.
	#[serde(serialize_with = "serialize_rfc3339")]
	pub at: OffsetDateTime,
}
impl ErrorLogEntry {
	/// Builds an entry for `error` raised by `method` + `url`.
	pub fn new(error: &Error, method: Method, url: impl Into<String>) -> Self {
		let status = match error {
			Error::HttpStatus { status, .. } => Some(*status),
			Error::MalformedResponse { status, .. } => *status,
			_ => None,
		};

		Self {
			kind: error.kind(),
			message: error.user_message().into_owned(),
			detail: render_chain(error),
			method,
			url: url.into(),
			status,
			at: OffsetDateTime::now_utc(),
		}
	}
}

fn serialize_rfc3339<S>(at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: serde::Serializer,
{
	let formatted = at.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

fn render_chain(error: &Error) -> String {
	let mut rendered = error.to_string();
	let mut source = std::error::Error::source(error);

	while let Some(cause) = source {
		rendered.push_str(": ");
		rendered.push_str(&cause.to_string());

		source = cause.source();
	}

	rendered
}
