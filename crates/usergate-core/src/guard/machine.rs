//! The session guard state machine.
//!
//! ```text
//! Unchecked --check--> Checking --+--> Unauthenticated
//!                                 +--> Authenticated
//!                                 +--> Authorized(role)
//!                                 +--> Forbidden(role)
//!                                 +--> Failed(reason)
//! ```
//!
//! A guard runs at most one probe at a time. Concurrent `check` calls join
//! the pending probe and all receive its verdict. A verdict computed against
//! a token that was replaced or cleared while the probe was in flight is
//! discarded, and the check starts over against the current token.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::debug;

use crate::api::ApiClient;

use super::{Action, AuthVerdict, Probe};

type PendingVerdict = Shared<BoxFuture<'static, AuthVerdict>>;

/// Where a guard is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Unchecked,
    Checking,
    Settled(AuthVerdict),
}

impl GuardState {
    pub fn verdict(&self) -> Option<&AuthVerdict> {
        match self {
            GuardState::Settled(verdict) => Some(verdict),
            _ => None,
        }
    }

    /// The action for a settled guard. `None` means the view must keep
    /// showing its interim "checking" indicator.
    pub fn action(&self) -> Option<Action> {
        self.verdict().map(AuthVerdict::action)
    }

    pub fn is_checking(&self) -> bool {
        matches!(self, GuardState::Checking)
    }
}

struct InFlight {
    id: u64,
    generation: u64,
    pending: PendingVerdict,
}

struct Inner {
    state: GuardState,
    in_flight: Option<InFlight>,
    /// Id of the check whose outcome `state` should reflect; 0 for none.
    current: u64,
    next_id: u64,
}

enum Step {
    Settled(AuthVerdict),
    Pending {
        id: u64,
        generation: u64,
        pending: PendingVerdict,
    },
}

/// Decides whether the current session may see a protected view.
///
/// Clone is cheap; clones share state, so every clone observes and joins the
/// same in-flight check.
#[derive(Clone)]
pub struct SessionGuard {
    client: ApiClient,
    probe: Probe,
    inner: Arc<Mutex<Inner>>,
}

impl SessionGuard {
    pub fn new(client: ApiClient, probe: Probe) -> Self {
        Self {
            client,
            probe,
            inner: Arc::new(Mutex::new(Inner {
                state: GuardState::Unchecked,
                in_flight: None,
                current: 0,
                next_id: 0,
            })),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    pub fn state(&self) -> GuardState {
        self.lock().state.clone()
    }

    /// Forget any verdict and any pending check.
    ///
    /// Callers already waiting on a check are detached rather than
    /// cancelled: they still receive its verdict, but the guard stays
    /// `Unchecked` until the next `check`.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = GuardState::Unchecked;
        inner.in_flight = None;
        inner.current = 0;
    }

    /// Register a view. Its checks are cancelled when it unmounts.
    pub fn mount(&self) -> Mount {
        let (unmounted, _) = watch::channel(false);
        Mount {
            guard: self.clone(),
            unmounted: Arc::new(unmounted),
        }
    }

    /// Run a check, or join the one already in flight.
    pub async fn check(&self) -> AuthVerdict {
        loop {
            match self.begin() {
                Step::Settled(verdict) => return verdict,
                Step::Pending {
                    id,
                    generation,
                    pending,
                } => {
                    let verdict = pending.await;
                    if self.settle(id, generation, &verdict) {
                        return verdict;
                    }
                    debug!(check = id, "Session changed during check, discarding verdict");
                }
            }
        }
    }

    fn begin(&self) -> Step {
        let (token, generation) = self.client.store().snapshot();
        let mut inner = self.lock();

        if let Some(ref in_flight) = inner.in_flight {
            if in_flight.generation == generation {
                debug!(check = in_flight.id, "Joining in-flight session check");
                return Step::Pending {
                    id: in_flight.id,
                    generation,
                    pending: in_flight.pending.clone(),
                };
            }
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.current = id;
        inner.in_flight = None;

        if token.is_none() {
            debug!(check = id, "No session token, skipping probe");
            inner.state = GuardState::Settled(AuthVerdict::Unauthenticated);
            return Step::Settled(AuthVerdict::Unauthenticated);
        }

        debug!(check = id, probe = ?self.probe.path(), "Starting session check");
        inner.state = GuardState::Checking;

        let client = self.client.clone();
        let probe = self.probe.clone();
        let pending = async move { probe.run(&client).await }.boxed().shared();
        inner.in_flight = Some(InFlight {
            id,
            generation,
            pending: pending.clone(),
        });

        Step::Pending {
            id,
            generation,
            pending,
        }
    }

    /// Record a finished check. Returns false if the verdict is stale.
    /// Only the latest check started since the last `reset` updates `state`.
    fn settle(&self, id: u64, generation: u64, verdict: &AuthVerdict) -> bool {
        let current_generation = self.client.store().generation();
        let mut inner = self.lock();

        if inner.in_flight.as_ref().map(|f| f.id) == Some(id) {
            inner.in_flight = None;
        }
        if current_generation != generation {
            return false;
        }
        if inner.current == id {
            debug!(check = id, %verdict, "Session check settled");
            inner.state = GuardState::Settled(verdict.clone());
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A view's registration with a guard.
///
/// Once unmounted (explicitly or by dropping), pending and future checks
/// resolve to `None` so no verdict is delivered to a view that is gone.
pub struct Mount {
    guard: SessionGuard,
    unmounted: Arc<watch::Sender<bool>>,
}

/// Lets another task unmount a view.
#[derive(Clone)]
pub struct UnmountHandle {
    unmounted: Arc<watch::Sender<bool>>,
}

impl UnmountHandle {
    pub fn unmount(&self) {
        self.unmounted.send_replace(true);
    }
}

impl Mount {
    /// Check the session for this view. `None` if the view unmounted first.
    pub async fn check(&self) -> Option<AuthVerdict> {
        let rx = self.unmounted.subscribe();
        if !self.is_mounted() {
            return None;
        }

        tokio::select! {
            verdict = self.guard.check() => self.is_mounted().then_some(verdict),
            _ = wait_unmounted(rx) => {
                debug!("View unmounted during session check, dropping verdict");
                None
            }
        }
    }

    pub async fn action(&self) -> Option<Action> {
        self.check().await.map(|verdict| verdict.action())
    }

    pub fn state(&self) -> GuardState {
        self.guard.state()
    }

    pub fn is_mounted(&self) -> bool {
        !*self.unmounted.borrow()
    }

    pub fn unmount(&self) {
        self.unmounted.send_replace(true);
    }

    pub fn unmount_handle(&self) -> UnmountHandle {
        UnmountHandle {
            unmounted: self.unmounted.clone(),
        }
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        self.unmounted.send_replace(true);
    }
}

async fn wait_unmounted(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
