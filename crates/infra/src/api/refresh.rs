//! Single-flight token refresh
//!
//! The first request that needs a new access token becomes the leader and
//! starts the refresh. Requests that need one while it is running queue up
//! behind it. Once the refresh settles, the coordinator dispatches every
//! replay itself: queued requests in arrival order, then the leader's.
//!
//! The refresh is driven by whoever holds the [`RefreshGuard`], not by the
//! leader's caller, so a caller that stops waiting never takes the queue
//! down with it.

use std::collections::VecDeque;
use std::future::Future;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use super::errors::ApiError;
use crate::http::{ApiRequest, HttpResponse};

/// Result of the refresh call: the new access token.
pub type Outcome = Result<String, ApiError>;

/// A request replayed with the refreshed token, and what the transport
/// answered.
#[derive(Debug)]
pub struct Replay {
    pub request: ApiRequest,
    pub result: Result<HttpResponse, ApiError>,
}

/// What a queued caller receives once the refresh settles.
#[derive(Debug)]
pub struct Settled {
    pub token: String,
    /// `None` when the caller only asked for a token.
    pub replay: Option<Replay>,
}

#[derive(Debug)]
struct Pending {
    request: Option<ApiRequest>,
    reply: oneshot::Sender<Result<Settled, ApiError>>,
}

#[derive(Debug, Default)]
struct RefreshState {
    in_flight: bool,
    leader: Option<Pending>,
    queue: VecDeque<Pending>,
}

/// Coordinates at most one refresh at a time.
///
/// The lock is only held for the check-and-set and for draining the queue,
/// never across an await.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Role assigned by [`RefreshCoordinator::join`].
#[derive(Debug)]
pub enum Ticket {
    /// No refresh was running. The holder must start one and have it call
    /// [`RefreshCoordinator::guard`].
    Leader(Waiter),
    /// A refresh is running; wait for its outcome.
    Waiter(Waiter),
}

impl Ticket {
    pub fn is_leader(&self) -> bool {
        matches!(self, Self::Leader(_))
    }

    pub fn into_waiter(self) -> Waiter {
        match self {
            Self::Leader(waiter) | Self::Waiter(waiter) => waiter,
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `request` for replay behind the next refresh, becoming the
    /// leader if none is running.
    pub fn join(&self, request: Option<ApiRequest>) -> Ticket {
        let (reply, rx) = oneshot::channel();
        let pending = Pending { request, reply };

        let mut state = self.state.lock();
        if state.in_flight {
            state.queue.push_back(pending);
            debug!(queued = state.queue.len(), "waiting for in-flight token refresh");
            Ticket::Waiter(Waiter(rx))
        } else {
            state.in_flight = true;
            state.leader = Some(pending);
            Ticket::Leader(Waiter(rx))
        }
    }

    /// Handle for the task performing the refresh that [`Ticket::Leader`]
    /// asked for.
    pub fn guard(&self) -> RefreshGuard<'_> {
        RefreshGuard { coordinator: self, settled: false }
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Number of requests queued behind the current refresh, leader excluded.
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Reset to idle and hand back everyone waiting: the queue in arrival
    /// order, then the leader.
    fn release(&self) -> Vec<Pending> {
        let mut state = self.state.lock();
        state.in_flight = false;
        let leader = state.leader.take();
        let mut pending: Vec<_> = std::mem::take(&mut state.queue).into();
        pending.extend(leader);
        pending
    }
}

/// The refreshing task's handle on the coordinator.
///
/// Dropping it without settling (the task panicked or was aborted) resets
/// the coordinator and fails everyone waiting with
/// [`ApiError::RefreshAborted`].
#[derive(Debug)]
#[must_use = "dropping the guard without settling aborts the refresh"]
pub struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Reset the coordinator and deliver `outcome`.
    ///
    /// On success every queued request is handed to `replay` with the new
    /// token as its bearer override, in FIFO order with the leader last. The
    /// replays run concurrently but each is first polled in that order, so
    /// they reach the transport in that order. Requests whose caller has
    /// stopped waiting are not replayed. On failure every caller gets the
    /// error and nothing is replayed.
    pub async fn settle<F, Fut>(mut self, outcome: Outcome, replay: F)
    where
        F: Fn(ApiRequest) -> Fut,
        Fut: Future<Output = Replay>,
    {
        self.settled = true;
        let pending = self.coordinator.release();
        debug!(waiters = pending.len(), success = outcome.is_ok(), "token refresh settled");

        let token = match outcome {
            Ok(token) => token,
            Err(err) => {
                for waiter in pending {
                    // A caller that went away has nobody to deliver to.
                    let _ = waiter.reply.send(Err(err.clone()));
                }
                return;
            }
        };

        let replays = pending.into_iter().map(|Pending { request, reply }| {
            // A caller that stopped waiting has cancelled its request.
            let request = request.filter(|_| !reply.is_closed());
            let dispatched = request.map(|mut request| {
                request.bearer_override = Some(token.clone());
                replay(request)
            });
            let token = token.clone();
            async move {
                let replay = match dispatched {
                    Some(dispatched) => Some(dispatched.await),
                    None => None,
                };
                let _ = reply.send(Ok(Settled { token, replay }));
            }
        });
        join_all(replays).await;
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let pending = self.coordinator.release();
            debug!(waiters = pending.len(), "token refresh abandoned");
        }
    }
}

/// A caller suspended behind the in-flight refresh.
#[derive(Debug)]
pub struct Waiter(oneshot::Receiver<Result<Settled, ApiError>>);

impl Waiter {
    pub async fn wait(self) -> Result<Settled, ApiError> {
        self.0.await.unwrap_or(Err(ApiError::RefreshAborted))
    }
}
