//! Single-flight guard for the access-token refresh
//!
//! At most one refresh call is in flight per client. The first request whose
//! token is rejected becomes the leader and performs the refresh; requests
//! rejected while the leader is still refreshing queue up as waiters and are
//! released, in arrival order, with the leader's outcome.

use crate::client::error::ClientError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Result shared with every waiter once a refresh settles
pub(crate) type RefreshOutcome = Result<(), Arc<ClientError>>;

#[derive(Debug, Default)]
struct GateState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh state machine: `Idle` or `Refreshing` plus the waiter queue
#[derive(Debug, Default)]
pub struct RefreshGate {
    state: Mutex<GateState>,
}

/// Role assigned to a request whose token was rejected
pub(crate) enum Admission<'a> {
    /// Perform the refresh and settle the gate
    Leader(LeaderGuard<'a>),
    /// Wait for the in-flight refresh
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh call is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of requests waiting on the in-flight refresh
    pub fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Check-and-set `Idle -> Refreshing`, or enqueue behind the current refresh
    pub(crate) fn admit(&self) -> Admission<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            Admission::Waiter(rx)
        } else {
            state.refreshing = true;
            Admission::Leader(LeaderGuard {
                gate: self,
                settled: false,
            })
        }
    }

    /// Return to `Idle` and release every waiter with `outcome`
    fn release(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            // a waiter whose request was dropped no longer listens
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held by the leader while it refreshes
///
/// Dropping the guard without settling (the leader's future was cancelled or
/// panicked) still returns the gate to `Idle` and fails all waiters.
pub(crate) struct LeaderGuard<'a> {
    gate: &'a RefreshGate,
    settled: bool,
}

impl LeaderGuard<'_> {
    pub(crate) fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.gate.release(&outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Token refresh dropped before settling, failing queued requests");
            self.gate
                .release(&Err(Arc::new(ClientError::RefreshAbandoned)));
        }
    }
}
