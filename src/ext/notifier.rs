//! User-facing failure notices.

// self
use crate::{_prelude::*, error::ErrorKind, options::ErrorMessageMode};

/// Presents failure messages to the user.
///
/// Called once per failed request unless its error message mode is
/// [`ErrorMessageMode::None`].
pub trait Notifier
where
	Self: Send + Sync,
{
	/// Shows `notice`.
	fn notify(&self, notice: ErrorNotice);
}

/// Message handed to a [`Notifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorNotice {
	/// Classification of the failure.
	pub kind: ErrorKind,
	/// Pre-defined user-facing message.
	pub message: String,
	/// Requested presentation.
	pub mode: ErrorMessageMode,
}
impl ErrorNotice {
	/// Builds the notice for `error` under `mode`, or `None` when notices are disabled.
	pub fn for_error(error: &Error, mode: ErrorMessageMode) -> Option<Self> {
		(mode != ErrorMessageMode::None).then(|| Self {
			kind: error.kind(),
			message: error.user_message().into_owned(),
			mode,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn silent_mode_produces_no_notice() {
		assert_eq!(ErrorNotice::for_error(&Error::Timeout, ErrorMessageMode::None), None);

		let notice = ErrorNotice::for_error(&Error::Timeout, ErrorMessageMode::Modal)
			.expect("Modal mode should notify.");

		assert_eq!(notice.kind, ErrorKind::Timeout);
		assert_eq!(notice.mode, ErrorMessageMode::Modal);
	}
}
