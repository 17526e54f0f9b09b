//! Refresh cycle participation: leading, queueing, and replaying.

// crates.io
use futures_util::future;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{PendingReplay, RequestClient},
	error::ConfigError,
	hooks::Reply,
	http::HttpTransport,
	obs::{self, Outcome, PipelineSpan, Stage},
	refresh::{Admission, RefreshCycle, Waiter},
};

type Cycle<'a> = RefreshCycle<'a, PendingReplay, Result<Reply>>;

impl<T> RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Recovers a request that failed with an expired credential.
	///
	/// `sent_token` is the credential the failed attempt carried, or `None` when the request
	/// never went out (proactive refresh). A request whose credential was already replaced
	/// by a finished cycle is replayed directly. A request whose stored refresh token was
	/// already rejected fails with that cycle's cause, without another refresh call.
	pub(super) async fn recover(
		&self,
		job: PendingReplay,
		sent_token: Option<TokenSecret>,
	) -> Result<Reply> {
		loop {
			if self.credential_rotated(sent_token.as_ref()) {
				return self.replay(&job).await;
			}

			let refresh_token = self.store.refresh_token();

			match self.refresh_state.begin_or_join(job.clone(), refresh_token.as_ref()) {
				Admission::Leader { cycle, job } =>
					return self.lead(cycle, job, refresh_token).await,
				Admission::Queued(queued) => {
					#[cfg(feature = "tracing")]
					tracing::debug!(cycle = queued.cycle(), "request queued behind refresh");

					if let Some(outcome) = queued.outcome().await {
						return outcome;
					}
				},
				Admission::Failed(failure) => {
					#[cfg(feature = "tracing")]
					tracing::debug!(cycle = failure.cycle(), "refresh token already rejected");

					return Err(Error::refresh_failed(failure.cause().clone()));
				},
			}
		}
	}

	async fn lead(
		&self,
		cycle: Cycle<'_>,
		job: PendingReplay,
		refresh_token: Option<TokenSecret>,
	) -> Result<Reply> {
		let renewed = self.renew(refresh_token.as_ref()).await;

		match renewed {
			Ok(()) => {
				let waiters = cycle.settle();
				let replay_waiter = move |waiter: Waiter<PendingReplay, Result<Reply>>| async move {
					if !waiter.is_abandoned() {
						let outcome = self.replay(waiter.job()).await;

						waiter.resolve(outcome);
					}
				};
				let (own, _) = future::join(
					self.replay(&job),
					future::join_all(waiters.into_iter().map(replay_waiter)),
				)
				.await;

				own
			},
			Err(e) => {
				let cause = Arc::new(e);
				let waiters = cycle.fail(refresh_token, cause.clone());

				self.session.on_session_expired(&cause.to_string());

				for waiter in waiters {
					waiter.resolve(Err(Error::refresh_failed(cause.clone())));
				}

				Err(Error::refresh_failed(cause))
			},
		}
	}

	/// Exchanges `refresh_token` and stores the issued credentials.
	async fn renew(&self, refresh_token: Option<&TokenSecret>) -> Result<()> {
		let span = PipelineSpan::new(Stage::Refresh, "renew");

		obs::record_outcome(Stage::Refresh, Outcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async {
				let refresher =
					self.refresher.as_ref().ok_or(ConfigError::MissingRefreshEndpoint)?;
				let refresh_token = refresh_token.ok_or(ConfigError::MissingRefreshToken)?;
				let issued =
					tokio::time::timeout(self.refresh_timeout, refresher.refresh(refresh_token))
						.await
						.map_err(|_| Error::Timeout)??;

				self.store.set_access_token(issued.access_token);

				if let Some(refresh_token) = issued.refresh_token {
					self.store.set_refresh_token(refresh_token);
				}

				Ok::<_, Error>(())
			})
			.await;

		match &result {
			Ok(()) => {
				#[cfg(feature = "tracing")]
				tracing::debug!("credential renewed");

				self.refresh_metrics.record_success();
				obs::record_outcome(Stage::Refresh, Outcome::Success);
			},
			Err(e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(kind = %e.kind(), "credential renewal failed: {e}");
				#[cfg(not(feature = "tracing"))]
				let _ = e;

				self.refresh_metrics.record_failure();
				obs::record_outcome(Stage::Refresh, Outcome::Failure);
			},
		}

		result
	}

	/// Re-sends a request with the current credential. The outcome is final: another
	/// [`Error::AuthExpired`] is returned as-is instead of starting a second cycle.
	async fn replay(&self, job: &PendingReplay) -> Result<Reply> {
		let span = PipelineSpan::new(Stage::Replay, job.prepared.method.as_str());

		self.refresh_metrics.record_replay();
		obs::record_outcome(Stage::Replay, Outcome::Attempt);

		let outcome = span.instrument(self.attempt(job)).await.outcome;

		match &outcome {
			Ok(_) => obs::record_outcome(Stage::Replay, Outcome::Success),
			Err(_) => obs::record_outcome(Stage::Replay, Outcome::Failure),
		}

		outcome
	}

	fn credential_rotated(&self, sent_token: Option<&TokenSecret>) -> bool {
		sent_token.is_some_and(|sent| {
			self.store.access_token().is_some_and(|current| current != *sent)
		})
	}
}
