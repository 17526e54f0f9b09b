//! Session expiry signal consumed by the surrounding application.

/// Receives the logout signal emitted when credential renewal fails.
///
/// The signal fires once per failed refresh cycle, no matter how many requests were waiting
/// on it. Implementations typically clear local state and route the user to a login screen.
pub trait SessionListener
where
	Self: Send + Sync,
{
	/// Called after a refresh cycle failed; `reason` summarizes the renewal error.
	fn on_session_expired(&self, reason: &str);
}
impl<F> SessionListener for F
where
	F: Fn(&str) + Send + Sync,
{
	fn on_session_expired(&self, reason: &str) {
		self(reason)
	}
}
