//! Single-flight refresh state shared by every clone of a client.
//!
//! [`RefreshState::begin_or_join`] is the only transition out of `Idle`. It checks the phase
//! and either starts a cycle or enqueues the caller inside one synchronous critical section,
//! so two callers can never both become leaders of overlapping cycles. The section never
//! spans an `.await`.
//!
//! The leader receives a [`RefreshCycle`]. Settling it returns the queued waiters in FIFO
//! order and puts the state back to `Idle`. Dropping it unsettled (the leader was cancelled)
//! abandons the cycle: the state returns to `Idle` and every waiter observes `None`, after
//! which it may try again. A [`QueuedRequest`] that is dropped while still queued withdraws
//! itself without affecting the others.
//!
//! A cycle that fails is remembered together with the refresh token it presented. Until the
//! credential store holds a different refresh token, later callers are answered with that
//! [`RefreshFailure`] instead of starting another cycle.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Refresh lifecycle: `idle -> refreshing -> idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
	/// No refresh call is in flight.
	Idle,
	/// A refresh call is in flight.
	Refreshing {
		/// Identifier of the running cycle.
		cycle: u64,
	},
}

/// Process-wide refresh state carrying jobs of type `J` and outcomes of type `R`.
pub struct RefreshState<J, R> {
	inner: Mutex<Inner<J, R>>,
}
impl<J, R> RefreshState<J, R> {
	/// Creates an idle state with an empty queue.
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(Inner {
				phase: RefreshPhase::Idle,
				next_cycle: 1,
				next_waiter: 1,
				queue: VecDeque::new(),
				failure: None,
			}),
		}
	}

	/// Returns the current phase.
	pub fn phase(&self) -> RefreshPhase {
		self.inner.lock().phase
	}

	/// Returns the number of requests waiting on the running cycle.
	pub fn queued(&self) -> usize {
		self.inner.lock().queue.len()
	}

	/// Returns the last failed cycle, if no cycle has succeeded since.
	pub fn last_failure(&self) -> Option<RefreshFailure> {
		self.inner.lock().failure.clone()
	}

	/// Starts a refresh cycle, or joins the running one.
	///
	/// `refresh_token` is the refresh token currently stored. When the state is `Idle` and the
	/// last cycle failed with that same token, the caller gets the recorded failure. Otherwise
	/// an idle state makes the caller the leader, handing `job` back untouched, and a running
	/// cycle appends `job` to its FIFO queue.
	pub fn begin_or_join(
		&self,
		job: J,
		refresh_token: Option<&TokenSecret>,
	) -> Admission<'_, J, R> {
		let mut inner = self.inner.lock();

		match inner.phase {
			RefreshPhase::Idle => {
				let rejected = inner.failure.as_ref().filter(|failure| {
					failure.rejected.as_ref() == refresh_token
				});

				if let Some(failure) = rejected {
					return Admission::Failed(failure.clone());
				}

				let id = inner.next_cycle;

				inner.next_cycle += 1;
				inner.phase = RefreshPhase::Refreshing { cycle: id };

				Admission::Leader { cycle: RefreshCycle { state: self, id, settled: false }, job }
			},
			RefreshPhase::Refreshing { cycle } => {
				let id = inner.next_waiter;
				let (reply, outcome) = oneshot::channel();

				inner.next_waiter += 1;
				inner.queue.push_back(Waiter { id, job, reply });

				Admission::Queued(QueuedRequest { state: self, id, cycle, outcome })
			},
		}
	}

	fn finish(&self, cycle: u64, verdict: Verdict) -> Vec<Waiter<J, R>> {
		let mut inner = self.inner.lock();

		if inner.phase != (RefreshPhase::Refreshing { cycle }) {
			return Vec::new();
		}

		inner.phase = RefreshPhase::Idle;

		match verdict {
			Verdict::Renewed => inner.failure = None,
			Verdict::Failed(failure) => inner.failure = Some(failure),
			Verdict::Abandoned => (),
		}

		inner.queue.drain(..).collect()
	}

	fn withdraw(&self, id: u64) {
		let withdrawn = {
			let mut inner = self.inner.lock();
			let index = inner.queue.iter().position(|waiter| waiter.id == id);

			index.and_then(|i| inner.queue.remove(i))
		};

		drop(withdrawn);
	}
}
impl<J, R> Default for RefreshState<J, R> {
	fn default() -> Self {
		Self::new()
	}
}
impl<J, R> Debug for RefreshState<J, R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let inner = self.inner.lock();

		f.debug_struct("RefreshState")
			.field("phase", &inner.phase)
			.field("queued", &inner.queue.len())
			.field("failed_cycle", &inner.failure.as_ref().map(|failure| failure.cycle))
			.finish()
	}
}

struct Inner<J, R> {
	phase: RefreshPhase,
	next_cycle: u64,
	next_waiter: u64,
	queue: VecDeque<Waiter<J, R>>,
	failure: Option<RefreshFailure>,
}

enum Verdict {
	Renewed,
	Failed(RefreshFailure),
	Abandoned,
}

/// A refresh cycle that failed, kept until a later cycle succeeds.
#[derive(Clone, Debug)]
pub struct RefreshFailure {
	cycle: u64,
	rejected: Option<TokenSecret>,
	cause: Arc<Error>,
}
impl RefreshFailure {
	/// Returns the identifier of the failed cycle.
	pub fn cycle(&self) -> u64 {
		self.cycle
	}

	/// Returns the error the cycle failed with.
	pub fn cause(&self) -> &Arc<Error> {
		&self.cause
	}
}

/// Result of [`RefreshState::begin_or_join`].
#[derive(Debug)]
pub enum Admission<'a, J, R> {
	/// The caller started a new cycle and must run the refresh.
	Leader {
		/// Handle that settles (or, when dropped, abandons) the cycle.
		cycle: RefreshCycle<'a, J, R>,
		/// The caller's own job, handed back.
		job: J,
	},
	/// The caller joined a running cycle.
	Queued(QueuedRequest<'a, J, R>),
	/// The stored refresh token was already rejected by an earlier cycle.
	Failed(RefreshFailure),
}

/// Leader-side handle of a running cycle.
pub struct RefreshCycle<'a, J, R> {
	state: &'a RefreshState<J, R>,
	id: u64,
	settled: bool,
}
impl<J, R> RefreshCycle<'_, J, R> {
	/// Returns the cycle identifier.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Ends the cycle after a successful renewal and returns its waiters in enqueue order.
	pub fn settle(mut self) -> Vec<Waiter<J, R>> {
		self.settled = true;

		self.state.finish(self.id, Verdict::Renewed)
	}

	/// Ends the cycle after a failed renewal and returns its waiters in enqueue order.
	///
	/// `rejected` is the refresh token the cycle presented; every later caller still holding
	/// it is answered with this failure.
	pub fn fail(mut self, rejected: Option<TokenSecret>, cause: Arc<Error>) -> Vec<Waiter<J, R>> {
		self.settled = true;

		let failure = RefreshFailure { cycle: self.id, rejected, cause };

		self.state.finish(self.id, Verdict::Failed(failure))
	}
}
impl<J, R> Drop for RefreshCycle<'_, J, R> {
	fn drop(&mut self) {
		if !self.settled {
			// Dropping the waiters closes their channels.
			drop(self.state.finish(self.id, Verdict::Abandoned));
		}
	}
}
impl<J, R> Debug for RefreshCycle<'_, J, R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCycle")
			.field("id", &self.id)
			.field("settled", &self.settled)
			.finish()
	}
}

/// Waiter-side handle of a running cycle.
pub struct QueuedRequest<'a, J, R> {
	state: &'a RefreshState<J, R>,
	id: u64,
	cycle: u64,
	outcome: oneshot::Receiver<R>,
}
impl<J, R> QueuedRequest<'_, J, R> {
	/// Returns the identifier of the cycle this request joined.
	pub fn cycle(&self) -> u64 {
		self.cycle
	}

	/// Waits for the leader to resolve this request.
	///
	/// Returns `None` when the cycle was abandoned before reaching this request.
	pub async fn outcome(mut self) -> Option<R> {
		(&mut self.outcome).await.ok()
	}
}
impl<J, R> Drop for QueuedRequest<'_, J, R> {
	fn drop(&mut self) {
		self.state.withdraw(self.id);
	}
}
impl<J, R> Debug for QueuedRequest<'_, J, R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("QueuedRequest").field("id", &self.id).field("cycle", &self.cycle).finish()
	}
}

/// A queued job handed to the leader when its cycle settles.
pub struct Waiter<J, R> {
	id: u64,
	job: J,
	reply: oneshot::Sender<R>,
}
impl<J, R> Waiter<J, R> {
	/// Borrows the queued job.
	pub fn job(&self) -> &J {
		&self.job
	}

	/// Returns `true` once the waiting request has gone away.
	pub fn is_abandoned(&self) -> bool {
		self.reply.is_closed()
	}

	/// Delivers `outcome` to the waiting request.
	pub fn resolve(self, outcome: R) {
		let _ = self.reply.send(outcome);
	}
}
impl<J, R> Debug for Waiter<J, R> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Waiter").field("id", &self.id).finish_non_exhaustive()
	}
}
