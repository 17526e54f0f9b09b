//! Request client facade composing the hooks, the transport, and the refresh coordinator.
//!
//! Every public operation funnels into one dispatch path:
//!
//! 1. options are merged per key: client defaults, then descriptor overrides, then call overrides;
//! 2. the pre-send hooks build a [`PreparedRequest`] once;
//! 3. each attempt attaches the current credential, sends under the per-request timeout, and
//!    runs the response through the transformer (GET requests may retry transient failures);
//! 4. an [`Error::AuthExpired`] outcome enters the refresh coordinator, which replays the
//!    request at most once with the renewed credential;
//! 5. the final failure, if any, is reported once to the error log and the notifier.

mod builder;
mod recovery;

pub use builder::RequestClientBuilder;

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, jwt},
	classify,
	error::TransportError,
	ext::{ErrorLog, ErrorLogEntry, ErrorNotice, Notifier, SessionListener},
	hooks::{self, PayloadNormalizer, PreparedRequest, Reply, ResponseTransformer, credential},
	http::HttpTransport,
	obs::{self, Outcome, PipelineSpan, Stage},
	options::{self, ErrorMessageMode, RequestOptions, RequestOverrides},
	refresh::{RefreshEndpoint, RefreshMetrics, RefreshState},
	request::{Method, RequestDescriptor},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Refresh state specialized for client replays.
pub type ReplayState = RefreshState<PendingReplay, Result<Reply>>;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's bundled reqwest transport.
pub type ReqwestRequestClient = RequestClient<ReqwestTransport>;

/// Request waiting for a refresh cycle: the prepared request plus its merged options.
#[derive(Clone, Debug)]
pub struct PendingReplay {
	prepared: Arc<PreparedRequest>,
	options: Arc<RequestOptions>,
}
impl PendingReplay {
	/// Borrows the prepared request.
	pub fn prepared(&self) -> &PreparedRequest {
		&self.prepared
	}

	/// Borrows the merged options.
	pub fn options(&self) -> &RequestOptions {
		&self.options
	}
}

/// Layered HTTP client with credential attachment and single-flight refresh.
///
/// Clones share the transport, the collaborators, and the refresh state, so every clone
/// takes part in the same refresh cycles.
pub struct RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	refresher: Option<Arc<dyn RefreshEndpoint>>,
	session: Arc<dyn SessionListener>,
	error_log: Arc<dyn ErrorLog>,
	notifier: Arc<dyn Notifier>,
	normalizer: PayloadNormalizer,
	transformer: ResponseTransformer,
	defaults: RequestOptions,
	refresh_timeout: Duration,
	proactive_refresh: bool,
	refresh_state: Arc<ReplayState>,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl<T> RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Starts a builder around `transport`.
	pub fn builder(transport: impl Into<Arc<T>>) -> RequestClientBuilder<T> {
		RequestClientBuilder::new(transport)
	}

	/// Sends `descriptor` as a `GET` request.
	pub async fn get(
		&self,
		descriptor: &RequestDescriptor,
		overrides: &RequestOverrides,
	) -> Result<Reply> {
		self.dispatch(Method::Get, descriptor, overrides, false).await
	}

	/// Sends `descriptor` as a `POST` request.
	pub async fn post(
		&self,
		descriptor: &RequestDescriptor,
		overrides: &RequestOverrides,
	) -> Result<Reply> {
		self.dispatch(Method::Post, descriptor, overrides, false).await
	}

	/// Sends `descriptor` as a `POST` request with a JSON body, whatever the configured
	/// content type or caller headers say.
	pub async fn post_json(
		&self,
		descriptor: &RequestDescriptor,
		overrides: &RequestOverrides,
	) -> Result<Reply> {
		self.dispatch(Method::Post, descriptor, overrides, true).await
	}

	/// Sends `descriptor` as a `DELETE` request.
	pub async fn delete(
		&self,
		descriptor: &RequestDescriptor,
		overrides: &RequestOverrides,
	) -> Result<Reply> {
		self.dispatch(Method::Delete, descriptor, overrides, false).await
	}

	/// Sends `descriptor` with its own method.
	pub async fn request(
		&self,
		descriptor: &RequestDescriptor,
		overrides: &RequestOverrides,
	) -> Result<Reply> {
		self.dispatch(descriptor.method, descriptor, overrides, false).await
	}

	/// Returns the client-wide default options.
	pub fn defaults(&self) -> &RequestOptions {
		&self.defaults
	}

	/// Returns the credential store.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Returns the transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Returns the refresh state shared by this client and its clones.
	pub fn refresh_state(&self) -> &Arc<ReplayState> {
		&self.refresh_state
	}

	/// Returns the refresh counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	async fn dispatch(
		&self,
		method: Method,
		descriptor: &RequestDescriptor,
		overrides: &RequestOverrides,
		force_json: bool,
	) -> Result<Reply> {
		let options =
			options::merge(&options::merge(&self.defaults, &descriptor.options), overrides);
		let mode = options.error_message_mode;
		let span = PipelineSpan::new(Stage::Request, method.as_str());

		obs::record_outcome(Stage::Request, Outcome::Attempt);

		let (url, result) =
			match hooks::prepare(method, descriptor, &options, &self.normalizer, force_json) {
				Ok(prepared) => {
					let url = prepared.url.to_string();

					(url, span.instrument(self.execute(prepared, options)).await)
				},
				Err(e) => (descriptor.url.clone(), Err(e)),
			};

		match &result {
			Ok(_) => obs::record_outcome(Stage::Request, Outcome::Success),
			Err(e) => {
				obs::record_outcome(Stage::Request, Outcome::Failure);

				self.report(e, method, url, mode);
			},
		}

		result
	}

	async fn execute(&self, prepared: PreparedRequest, options: RequestOptions) -> Result<Reply> {
		let job = PendingReplay { prepared: Arc::new(prepared), options: Arc::new(options) };

		if self.access_token_expired(&job.options) {
			return self.recover(job, None).await;
		}

		let attempt = self.attempt(&job).await;

		match attempt.outcome {
			Err(Error::AuthExpired) if attempt.sent_token.is_some() =>
				self.recover(job, attempt.sent_token).await,
			outcome => outcome,
		}
	}

	/// Sends the job, retrying transient failures of GET requests per the retry policy.
	async fn attempt(&self, job: &PendingReplay) -> Attempt {
		let policy = job.options.retry;
		let retryable = job.prepared.method.is_get_like();
		let mut retries = 0;

		loop {
			let attempt = self.send_once(job).await;

			match &attempt.outcome {
				Err(e) if retryable && e.is_transient() && retries < policy.count => {
					retries += 1;

					tokio::time::sleep(policy.backoff(retries)).await;
				},
				_ => return attempt,
			}
		}
	}

	async fn send_once(&self, job: &PendingReplay) -> Attempt {
		let mut headers = job.prepared.headers.clone();
		let sent_token = credential::attach(&mut headers, &job.options, self.store.as_ref());
		let timeout = job.options.timeout();
		let wire = job.prepared.to_wire(headers, timeout);
		let sent = match timeout {
			Some(limit) => tokio::time::timeout(limit, self.transport.send(wire))
				.await
				.unwrap_or_else(|_| Err(TransportError::Timeout)),
			None => self.transport.send(wire).await,
		};
		let outcome = sent.map_err(classify::transport_error).and_then(|response| {
			self.transformer.transform(response, &job.options, self.store.as_ref())
		});

		Attempt { outcome, sent_token }
	}

	fn access_token_expired(&self, options: &RequestOptions) -> bool {
		self.proactive_refresh
			&& options.with_token
			&& self.refresher.is_some()
			&& self
				.store
				.access_token()
				.is_some_and(|token| jwt::is_expired_at(token.expose(), OffsetDateTime::now_utc()))
	}

	fn report(&self, error: &Error, method: Method, url: String, mode: ErrorMessageMode) {
		#[cfg(feature = "tracing")]
		tracing::warn!(kind = %error.kind(), %method, url = %url, "request failed: {error}");

		self.error_log.record(ErrorLogEntry::new(error, method, url));

		if let Some(notice) = ErrorNotice::for_error(error, mode) {
			self.notifier.notify(notice);
		}
	}
}
impl<T> Clone for RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			refresher: self.refresher.clone(),
			session: self.session.clone(),
			error_log: self.error_log.clone(),
			notifier: self.notifier.clone(),
			normalizer: self.normalizer.clone(),
			transformer: self.transformer.clone(),
			defaults: self.defaults.clone(),
			refresh_timeout: self.refresh_timeout,
			proactive_refresh: self.proactive_refresh,
			refresh_state: self.refresh_state.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
		}
	}
}
impl<T> Debug for RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClient")
			.field("defaults", &self.defaults)
			.field("refresh_endpoint_set", &self.refresher.is_some())
			.field("refresh_timeout", &self.refresh_timeout)
			.field("refresh_state", &self.refresh_state)
			.finish_non_exhaustive()
	}
}

/// Outcome of one attempt plus the credential it carried.
struct Attempt {
	outcome: Result<Reply>,
	sent_token: Option<TokenSecret>,
}
