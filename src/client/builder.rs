//! Builder for [`RequestClient`].

// self
use crate::{
	_prelude::*,
	client::{ReplayState, RequestClient},
	ext::{Discard, ErrorLog, Notifier, SessionListener},
	hooks::{PayloadNormalizer, ResponseTransformer},
	http::HttpTransport,
	options::{EnvelopeConfig, RequestOptions},
	refresh::{JsonRefreshEndpoint, RefreshEndpoint},
	store::{CredentialStore, MemoryCredentialStore},
};

/// Collects the collaborators and defaults of a [`RequestClient`].
///
/// Every collaborator is optional: the credential store defaults to an empty
/// [`MemoryCredentialStore`], the session listener, error log, and notifier default to
/// [`Discard`], and without a refresh endpoint every expired credential ends the session.
pub struct RequestClientBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Option<Arc<dyn CredentialStore>>,
	refresher: Option<Arc<dyn RefreshEndpoint>>,
	session: Option<Arc<dyn SessionListener>>,
	error_log: Option<Arc<dyn ErrorLog>>,
	notifier: Option<Arc<dyn Notifier>>,
	normalizer: PayloadNormalizer,
	envelope: EnvelopeConfig,
	rotated_token_header: Option<String>,
	defaults: RequestOptions,
	refresh_timeout: Duration,
	proactive_refresh: bool,
	refresh_state: Option<Arc<ReplayState>>,
}
impl<T> RequestClientBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	/// Default upper bound for one refresh endpoint call.
	pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

	/// Creates a builder around `transport` with default options.
	pub fn new(transport: impl Into<Arc<T>>) -> Self {
		Self {
			transport: transport.into(),
			store: None,
			refresher: None,
			session: None,
			error_log: None,
			notifier: None,
			normalizer: PayloadNormalizer::default(),
			envelope: EnvelopeConfig::default(),
			rotated_token_header: None,
			defaults: RequestOptions::default(),
			refresh_timeout: Self::DEFAULT_REFRESH_TIMEOUT,
			proactive_refresh: true,
			refresh_state: None,
		}
	}

	/// Replaces the client-wide default options.
	pub fn defaults(mut self, defaults: RequestOptions) -> Self {
		self.defaults = defaults;

		self
	}

	/// Sets the API origin relative paths resolve against.
	pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
		self.defaults.api_url = Some(api_url.into());

		self
	}

	/// Sets the path prefix shared by every API route.
	pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.defaults.url_prefix = Some(prefix.into());

		self
	}

	/// Sets the credential store.
	pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Sets the refresh endpoint.
	pub fn refresh_endpoint(mut self, refresher: Arc<dyn RefreshEndpoint>) -> Self {
		self.refresher = Some(refresher);

		self
	}

	/// Uses a [`JsonRefreshEndpoint`] at `url` that shares this client's transport.
	pub fn refresh_url(mut self, url: Url) -> Self {
		self.refresher = Some(Arc::new(JsonRefreshEndpoint::<T>::new(self.transport.clone(), url)));

		self
	}

	/// Sets the listener notified when a refresh cycle fails.
	pub fn session_listener(mut self, session: Arc<dyn SessionListener>) -> Self {
		self.session = Some(session);

		self
	}

	/// Sets the diagnostic error log.
	pub fn error_log(mut self, error_log: Arc<dyn ErrorLog>) -> Self {
		self.error_log = Some(error_log);

		self
	}

	/// Sets the user-facing notifier.
	pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
		self.notifier = Some(notifier);

		self
	}

	/// Replaces the payload normalizer.
	pub fn payload_normalizer(mut self, normalizer: PayloadNormalizer) -> Self {
		self.normalizer = normalizer;

		self
	}

	/// Replaces the response envelope shape.
	pub fn envelope(mut self, envelope: EnvelopeConfig) -> Self {
		self.envelope = envelope;

		self
	}

	/// Harvests rotated access tokens from response header `name`.
	pub fn rotated_token_header(mut self, name: impl Into<String>) -> Self {
		self.rotated_token_header = Some(name.into());

		self
	}

	/// Bounds each refresh endpoint call; an elapsed refresh counts as a failed renewal.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Enables or disables refreshing before the first send when the stored access token is
	/// a JWT whose `exp` has passed.
	pub fn proactive_refresh(mut self, enabled: bool) -> Self {
		self.proactive_refresh = enabled;

		self
	}

	/// Shares refresh state with other clients so they take part in the same cycles.
	pub fn refresh_state(mut self, state: Arc<ReplayState>) -> Self {
		self.refresh_state = Some(state);

		self
	}

	/// Builds the client.
	pub fn build(self) -> RequestClient<T> {
		let transformer = match self.rotated_token_header {
			Some(name) => ResponseTransformer::new(self.envelope).with_rotated_token_header(name),
			None => ResponseTransformer::new(self.envelope),
		};

		RequestClient {
			transport: self.transport,
			store: self.store.unwrap_or_else(|| Arc::new(MemoryCredentialStore::default())),
			refresher: self.refresher,
			session: self.session.unwrap_or_else(|| Arc::new(Discard)),
			error_log: self.error_log.unwrap_or_else(|| Arc::new(Discard)),
			notifier: self.notifier.unwrap_or_else(|| Arc::new(Discard)),
			normalizer: self.normalizer,
			transformer,
			defaults: self.defaults,
			refresh_timeout: self.refresh_timeout,
			proactive_refresh: self.proactive_refresh,
			refresh_state: self.refresh_state.unwrap_or_default(),
			refresh_metrics: Default::default(),
		}
	}
}
impl<T> Debug for RequestClientBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClientBuilder")
			.field("defaults", &self.defaults)
			.field("refresh_endpoint_set", &self.refresher.is_some())
			.field("refresh_timeout", &self.refresh_timeout)
			.field("proactive_refresh", &self.proactive_refresh)
			.finish_non_exhaustive()
	}
}
