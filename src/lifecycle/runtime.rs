//! Per-hook start/stop state machine.
//!
//! # Responsibilities
//! - Run `start` and `stop` in dedicated tasks so a hanging hook never blocks
//!   the engine
//! - Race startup against the shared cancellation token
//! - Collect outstanding outcomes within the shutdown timeout
//!
//! # Design Decisions
//! - One `oneshot` channel per phase; dropping a receiver after a timeout
//!   silently discards the late outcome
//! - Panics are caught at the task boundary and turned into `HookError::Crashed`
//! - Timed-out tasks are detached, never aborted

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::error::{BoxError, HookError, Outcome};
use crate::lifecycle::hook::Hook;
use crate::observability::metrics;

/// Drives one hook through a single run of the engine.
///
/// A slot holding `Some` means the corresponding phase was launched and its
/// outcome has not been collected yet.
#[derive(Debug)]
pub struct HookRuntime {
    name: String,
    start_slot: Option<oneshot::Receiver<Outcome>>,
    stop_slot: Option<oneshot::Receiver<Outcome>>,
}

enum Collected {
    Start(Outcome),
    Stop(Outcome),
    Expired,
}

impl HookRuntime {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_slot: None,
            stop_slot: None,
        }
    }

    /// Start the hook and block until either shutdown is requested through
    /// `ctx` or the hook's `start` returns on its own.
    ///
    /// Returns the startup error when `start` finished first with an error.
    /// In that case no stop is owed and the caller must shut every other
    /// hook down.
    pub async fn wait_for_event(&mut self, ctx: &CancellationToken, hook: &Arc<dyn Hook>) -> Outcome {
        let starting = Arc::clone(hook);
        let start_ctx = ctx.clone();
        self.start_slot = Some(spawn_phase(async move { starting.start(start_ctx).await }));

        tracing::debug!(hook = %self.name, "Hook started");

        let startup = tokio::select! {
            _ = ctx.cancelled() => None,
            outcome = recv(&mut self.start_slot) => Some(outcome),
        };

        match startup {
            None => {
                let stopping = Arc::clone(hook);
                let stop_ctx = ctx.clone();
                self.stop_slot = Some(spawn_phase(async move { stopping.stop(stop_ctx).await }));
                tracing::debug!(hook = %self.name, "Hook stop requested");
                Ok(())
            }
            Some(outcome) => {
                // The hook finished unprompted: nothing left to collect.
                self.start_slot = None;
                self.stop_slot = None;
                outcome
            }
        }
    }

    /// Wait for the outstanding `start`/`stop` outcomes, giving up after `timeout`.
    ///
    /// Returns every error observed. Tasks still running at the deadline keep
    /// running in the background; whatever they return is dropped.
    pub async fn shutdown(&mut self, timeout: Duration) -> Vec<HookError> {
        let mut failures = Vec::new();
        let expiry = tokio::time::sleep_until(Instant::now() + timeout);
        tokio::pin!(expiry);

        while !self.is_settled() {
            let start_pending = self.start_slot.is_some();
            let stop_pending = self.stop_slot.is_some();

            let collected = tokio::select! {
                outcome = recv(&mut self.start_slot), if start_pending => Collected::Start(outcome),
                outcome = recv(&mut self.stop_slot), if stop_pending => Collected::Stop(outcome),
                _ = &mut expiry => Collected::Expired,
            };

            match collected {
                Collected::Start(outcome) => {
                    self.start_slot = None;
                    if let Err(err) = outcome {
                        failures.push(err);
                    }
                }
                Collected::Stop(outcome) => {
                    self.stop_slot = None;
                    if let Err(err) = outcome {
                        failures.push(err);
                    }
                }
                Collected::Expired => {
                    tracing::warn!(
                        hook = %self.name,
                        start_pending = self.start_slot.is_some(),
                        stop_pending = self.stop_slot.is_some(),
                        timeout = ?timeout,
                        "Hook did not shut down before timeout, abandoning it"
                    );
                    metrics::record_hook_abandoned(&self.name);
                    // Dropping the receivers detaches the orphaned tasks.
                    self.start_slot = None;
                    self.stop_slot = None;
                    break;
                }
            }
        }

        failures
    }

    /// True once no outcome is outstanding.
    pub fn is_settled(&self) -> bool {
        self.start_slot.is_none() && self.stop_slot.is_none()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Run one hook phase in its own task, recovering panics, and hand back the
/// receiving end of its outcome slot.
fn spawn_phase<F>(phase: F) -> oneshot::Receiver<Outcome>
where
    F: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let outcome = match AssertUnwindSafe(phase).catch_unwind().await {
            Ok(result) => result.map_err(HookError::Failed),
            Err(payload) => Err(HookError::from_panic(payload)),
        };
        // The receiver is gone when the engine already gave up on this hook.
        let _ = tx.send(outcome);
    });
    rx
}

async fn recv(slot: &mut Option<oneshot::Receiver<Outcome>>) -> Outcome {
    match slot {
        // A dropped sender means the task was torn down with the runtime.
        Some(rx) => rx.await.unwrap_or(Ok(())),
        None => std::future::pending().await,
    }
}
