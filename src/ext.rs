//! Collaborator contracts the pipeline reports to.
//!
//! The pipeline performs no navigation, rendering, or persistence of diagnostics itself.
//! It hands session expiry, diagnostic entries, and user notices to these traits and leaves
//! the presentation to the surrounding application. [`Discard`] implements all three as
//! no-ops and is the default for every slot of the client builder.

pub mod error_log;
pub mod notifier;
pub mod session;

pub use error_log::*;
pub use notifier::*;
pub use session::*;

/// Collaborator that ignores everything it receives.
#[derive(Clone, Copy, Debug, Default)]
pub struct Discard;
impl SessionListener for Discard {
	fn on_session_expired(&self, _: &str) {}
}
impl ErrorLog for Discard {
	fn record(&self, _: ErrorLogEntry) {}
}
impl Notifier for Discard {
	fn notify(&self, _: ErrorNotice) {}
}
