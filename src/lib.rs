//! Layered HTTP request pipeline: request/response transform hooks, bearer credential
//! attachment, and single-flight token refresh with FIFO replay in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod error;
pub mod ext;
pub mod hooks;
pub mod http;
pub mod obs;
pub mod options;
pub mod refresh;
pub mod request;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fakes for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		auth::TokenSecret,
		error::TransportError,
		ext::{ErrorLog, ErrorLogEntry, ErrorNotice, Notifier, SessionListener},
		http::{HttpResponse, HttpTransport, TransportFuture, WireRequest},
		refresh::{RefreshEndpoint, RefreshFuture, RefreshedCredentials},
	};

	type Handler = dyn Fn(&WireRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

	/// Scripted transport that records every request in call order.
	#[derive(Clone)]
	pub struct RecordingTransport {
		handler: Arc<Handler>,
		requests: Arc<Mutex<Vec<WireRequest>>>,
		delay: Option<Duration>,
	}
	impl RecordingTransport {
		/// Creates a transport answering every request with `handler`.
		pub fn new(
			handler: impl 'static
			+ Fn(&WireRequest) -> Result<HttpResponse, TransportError>
			+ Send
			+ Sync,
		) -> Self {
			Self { handler: Arc::new(handler), requests: Default::default(), delay: None }
		}

		/// Delays every response by `delay`.
		pub fn with_delay(mut self, delay: Duration) -> Self {
			self.delay = Some(delay);

			self
		}

		/// Returns the recorded requests.
		pub fn requests(&self) -> Vec<WireRequest> {
			self.requests.lock().clone()
		}

		/// Returns the number of requests sent so far.
		pub fn calls(&self) -> usize {
			self.requests.lock().len()
		}

		/// Returns the URL path of every recorded request.
		pub fn paths(&self) -> Vec<String> {
			self.requests.lock().iter().map(|request| request.url.path().to_owned()).collect()
		}
	}
	impl HttpTransport for RecordingTransport {
		fn send(&self, request: WireRequest) -> TransportFuture<'_> {
			self.requests.lock().push(request.clone());

			let outcome = (self.handler)(&request);
			let delay = self.delay;

			Box::pin(async move {
				if let Some(delay) = delay {
					tokio::time::sleep(delay).await;
				}

				outcome
			})
		}
	}
	impl Debug for RecordingTransport {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.debug_struct("RecordingTransport").field("calls", &self.calls()).finish()
		}
	}

	/// Refresh endpoint that counts its calls and answers after a delay.
	#[derive(Debug)]
	pub struct CountingRefreshEndpoint {
		calls: AtomicUsize,
		delay: Duration,
		issue: Option<RefreshedCredentials>,
	}
	impl CountingRefreshEndpoint {
		/// Endpoint issuing `access_token` (and rotating the refresh token).
		pub fn issuing(access_token: &str) -> Self {
			Self {
				calls: AtomicUsize::new(0),
				delay: Duration::from_millis(20),
				issue: Some(RefreshedCredentials {
					access_token: TokenSecret::new(access_token),
					refresh_token: Some(TokenSecret::new(format!("{access_token}-refresh"))),
				}),
			}
		}

		/// Endpoint rejecting every refresh token.
		pub fn rejecting() -> Self {
			Self { calls: AtomicUsize::new(0), delay: Duration::from_millis(20), issue: None }
		}

		/// Overrides the response delay.
		pub fn with_delay(mut self, delay: Duration) -> Self {
			self.delay = delay;

			self
		}

		/// Returns the number of refresh calls.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl RefreshEndpoint for CountingRefreshEndpoint {
		fn refresh<'a>(&'a self, _: &'a TokenSecret) -> RefreshFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move {
				tokio::time::sleep(self.delay).await;

				self.issue.clone().ok_or(Error::AuthExpired)
			})
		}
	}

	/// Session listener recording every expiry signal.
	#[derive(Debug, Default)]
	pub struct RecordingSession(Mutex<Vec<String>>);
	impl RecordingSession {
		/// Returns the recorded reasons.
		pub fn reasons(&self) -> Vec<String> {
			self.0.lock().clone()
		}
	}
	impl SessionListener for RecordingSession {
		fn on_session_expired(&self, reason: &str) {
			self.0.lock().push(reason.to_owned());
		}
	}

	/// Error log recording every entry.
	#[derive(Debug, Default)]
	pub struct RecordingErrorLog(Mutex<Vec<ErrorLogEntry>>);
	impl RecordingErrorLog {
		/// Returns the recorded entries.
		pub fn entries(&self) -> Vec<ErrorLogEntry> {
			self.0.lock().clone()
		}
	}
	impl ErrorLog for RecordingErrorLog {
		fn record(&self, entry: ErrorLogEntry) {
			self.0.lock().push(entry);
		}
	}

	/// Notifier recording every notice.
	#[derive(Debug, Default)]
	pub struct RecordingNotifier(Mutex<Vec<ErrorNotice>>);
	impl RecordingNotifier {
		/// Returns the recorded notices.
		pub fn notices(&self) -> Vec<ErrorNotice> {
			self.0.lock().clone()
		}
	}
	impl Notifier for RecordingNotifier {
		fn notify(&self, notice: ErrorNotice) {
			self.0.lock().push(notice);
		}
	}

	/// Wraps `result` in a successful response envelope.
	pub fn envelope(result: Value) -> HttpResponse {
		let body = serde_json::json!({ "errorCode": 0, "message": "", "result": result });

		HttpResponse::json(200, &body)
	}

	/// Returns the `Authorization` header a request carried.
	pub fn authorization(request: &WireRequest) -> Option<&str> {
		request.headers.get("Authorization")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
