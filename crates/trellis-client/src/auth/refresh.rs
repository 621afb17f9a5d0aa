use std::future::Future;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::debug;

use super::error::AuthError;

type Outcome = Result<String, AuthError>;

enum GateState {
    Idle,
    Refreshing { waiters: Vec<oneshot::Sender<Outcome>> },
}

enum Entry {
    Driver,
    Waiter(oneshot::Receiver<Outcome>),
}

/// Single-flight coordinator for credential renewal.
///
/// The first caller that hits an expired credential becomes the driver
/// and performs the exchange; every caller arriving while the exchange is
/// in flight parks on a queued waiter and receives the driver's outcome.
/// No lock is held across the exchange; the discipline is queued
/// continuations, not blocking.
///
/// The gate is owned by whoever composes the transport and injected from
/// there, so the discipline is testable without process-wide state.
pub struct RefreshGate {
    state: Mutex<GateState>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Idle),
        }
    }

    /// Run `exchange` exactly once no matter how many callers pile in
    /// concurrently; every caller resolves with the same outcome.
    pub async fn renew<F, Fut>(&self, exchange: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        match self.enter() {
            Entry::Driver => {
                debug!("driving credential renewal");
                let outcome = exchange().await;
                self.settle(outcome.clone());
                outcome
            }
            Entry::Waiter(rx) => {
                debug!("queued behind in-flight renewal");
                match rx.await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AuthError::Transport("renewal driver went away".to_string())),
                }
            }
        }
    }

    fn enter(&self) -> Entry {
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            GateState::Idle => {
                *state = GateState::Refreshing { waiters: Vec::new() };
                Entry::Driver
            }
            GateState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Entry::Waiter(rx)
            }
        }
    }

    /// Release every queued waiter with the driver's outcome and return
    /// to idle.
    fn settle(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.state.lock().unwrap();
            match std::mem::replace(&mut *state, GateState::Idle) {
                GateState::Refreshing { waiters } => waiters,
                GateState::Idle => Vec::new(),
            }
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}
