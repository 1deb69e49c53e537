//! Gating a command on the session guard, the way a page gates its render.

use std::future::Future;
use std::io;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{debug, warn};
use usergate_core::guard::GuardState;
use usergate_core::{Action, ApiError, AuthError, SessionGuard};

use crate::prompt;

// ============================================================================
// Exit codes
// ============================================================================

pub const EXIT_LOGIN_REQUIRED: u8 = 2;
pub const EXIT_PERMISSION_DENIED: u8 = 3;
pub const EXIT_UNAVAILABLE: u8 = 4;
pub const EXIT_INTERRUPTED: u8 = 130;

/// Outcome of trying to enter a protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Granted,
    Blocked(u8),
}

/// Mount a view on `guard` and wait for its verdict.
///
/// Transient failures offer a retry when a terminal is attached.
pub async fn enter(guard: &SessionGuard) -> Result<Entry> {
    loop {
        let mount = guard.mount();
        if sends_request(guard) {
            eprintln!("Checking session...");
        } else {
            debug!(probe = ?guard.probe(), "Session check needs no request");
        }

        let Some(verdict) = mount.check().await else {
            eprintln!("Cancelled.");
            return Ok(Entry::Blocked(EXIT_INTERRUPTED));
        };
        debug!(verdict = %verdict, "Guard settled");

        let action = verdict.action();
        if action.is_retryable() {
            eprintln!("{}", action.message());
            eprintln!("  ({})", verdict);
            if prompt::is_interactive() && prompt::confirm("Retry?", true)? {
                continue;
            }
        }
        return Ok(perform(action));
    }
}

/// Whether checking `guard` now will hit the network.
fn sends_request(guard: &SessionGuard) -> bool {
    guard.probe().path().is_some() && guard.client().store().is_present()
}

/// Exit with [`EXIT_INTERRUPTED`] on the first Ctrl-C, whatever the command
/// is doing at the time (checking, loading, or blocked on a prompt).
///
/// Install once, before dispatch. Tokio's SIGINT listener replaces the
/// default handler for the rest of the process, so this listener must live
/// as long as the process does.
pub fn exit_on_interrupt() {
    tokio::spawn(on_interrupt(tokio::signal::ctrl_c(), |code| {
        std::process::exit(code)
    }));
}

async fn on_interrupt<S, F>(signal: S, exit: F)
where
    S: Future<Output = io::Result<()>>,
    F: FnOnce(i32),
{
    match signal.await {
        Ok(()) => {
            eprintln!("\nInterrupted.");
            exit(i32::from(EXIT_INTERRUPTED));
        }
        Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
    }
}

/// Carry out `action` for a view that was not allowed to render.
pub fn perform(action: Action) -> Entry {
    match action {
        Action::RenderProtectedContent => Entry::Granted,
        Action::RedirectToLogin => {
            eprintln!("{}", action.message());
            eprintln!("Run `usergate login` to sign in.");
            Entry::Blocked(EXIT_LOGIN_REQUIRED)
        }
        Action::ShowPermissionDenied => {
            eprintln!("{}", action.message());
            Entry::Blocked(EXIT_PERMISSION_DENIED)
        }
        // Message already shown by the retry loop
        Action::ShowRetryableError => Entry::Blocked(EXIT_UNAVAILABLE),
    }
}

/// The action for an error raised after the view rendered, if it maps to one.
///
/// A request can still be refused after the guard let the view through, e.g.
/// when the token expires between the check and the call.
pub fn action_for(err: &anyhow::Error) -> Option<Action> {
    let api = err.downcast_ref::<ApiError>()?;
    match api {
        ApiError::Auth(AuthError::Unauthenticated) => Some(Action::RedirectToLogin),
        ApiError::Auth(AuthError::Forbidden) => Some(Action::ShowPermissionDenied),
        _ => None,
    }
}

pub fn exit_code(entry: Entry) -> ExitCode {
    match entry {
        Entry::Granted => ExitCode::SUCCESS,
        Entry::Blocked(code) => ExitCode::from(code),
    }
}

/// One-line description of the guard state, for `status`.
pub fn describe(state: &GuardState) -> String {
    match state {
        GuardState::Unchecked => "not checked".to_string(),
        GuardState::Checking => "checking".to_string(),
        GuardState::Settled(verdict) => verdict.to_string(),
    }
}
