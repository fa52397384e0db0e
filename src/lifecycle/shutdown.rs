//! Shutdown coordination for the engine.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::options::Callback;
use crate::lifecycle::signals::{forward_signals, Signal};

/// Pending interrupts beyond the first are irrelevant; keep the buffer small.
const INTERRUPT_BUFFER: usize = 4;

/// What caused a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A configured signal, or a programmatic interrupt.
    Signal(Signal),
    /// The parent token was cancelled.
    Parent,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Signal(signal) => write!(f, "signal {}", signal),
            Trigger::Parent => f.write_str("parent cancellation"),
        }
    }
}

/// Cloneable handle delivering an interrupt to an engine, exactly like an OS signal.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: mpsc::Sender<Signal>,
}

impl InterruptHandle {
    /// Request a shutdown as if `Signal::Interrupt` had been received.
    pub fn interrupt(&self) {
        self.send(Signal::Interrupt);
    }

    /// Deliver `signal` as if it had been received from the OS.
    ///
    /// Does nothing once the engine has already shut down.
    pub fn send(&self, signal: Signal) {
        if let Err(e) = self.tx.try_send(signal) {
            tracing::debug!(signal = %signal, error = %e, "Interrupt not delivered");
        }
    }
}

/// Converts the first interrupt or parent cancellation into exactly one
/// cancellation of the shared token.
pub struct ShutdownTrigger {
    parent: CancellationToken,
    token: CancellationToken,
    signals: Vec<Signal>,
    interrupt_tx: mpsc::Sender<Signal>,
    interrupt_rx: mpsc::Receiver<Signal>,
    before_shutdown: Option<Callback>,
}

impl ShutdownTrigger {
    pub fn new(
        parent: CancellationToken,
        token: CancellationToken,
        signals: Vec<Signal>,
        before_shutdown: Option<Callback>,
    ) -> Self {
        let (interrupt_tx, interrupt_rx) = mpsc::channel(INTERRUPT_BUFFER);
        Self {
            parent,
            token,
            signals,
            interrupt_tx,
            interrupt_rx,
            before_shutdown,
        }
    }

    pub fn handle(&self) -> InterruptHandle {
        InterruptHandle {
            tx: self.interrupt_tx.clone(),
        }
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Block until a shutdown is requested, then run the before-shutdown
    /// callback and cancel the shared token.
    ///
    /// Returns `None` without running the callback when the shared token was
    /// cancelled by someone else first (a hook startup failure).
    pub async fn run(self) -> Option<Trigger> {
        let Self {
            parent,
            token,
            signals,
            interrupt_tx,
            mut interrupt_rx,
            before_shutdown,
        } = self;

        // Forwarders are unregistered when this future completes or is dropped.
        let _forwarders = forward_signals(&signals, interrupt_tx);

        let trigger = tokio::select! {
            Some(signal) = interrupt_rx.recv() => Trigger::Signal(signal),
            _ = parent.cancelled() => Trigger::Parent,
            _ = token.cancelled() => return None,
        };

        tracing::info!(trigger = %trigger, "Shutdown requested");

        if let Some(callback) = before_shutdown {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                tracing::error!("Before-shutdown callback panicked");
            }
        }

        token.cancel();
        Some(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_trigger(
        parent: CancellationToken,
        token: CancellationToken,
    ) -> (ShutdownTrigger, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let callback: Callback = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (
            ShutdownTrigger::new(parent, token, Vec::new(), Some(callback)),
            calls,
        )
    }

    #[tokio::test]
    async fn test_interrupt_fires_once() {
        let token = CancellationToken::new();
        let (trigger, calls) = counting_trigger(CancellationToken::new(), token.clone());
        let handle = trigger.handle();

        let task = tokio::spawn(trigger.run());
        handle.interrupt();
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.interrupt();

        assert_eq!(task.await.unwrap(), Some(Trigger::Signal(Signal::Interrupt)));
        assert!(token.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The trigger is gone; further interrupts are ignored.
        handle.interrupt();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parent_cancellation_triggers() {
        let parent = CancellationToken::new();
        let token = CancellationToken::new();
        let (trigger, calls) = counting_trigger(parent.clone(), token.clone());

        let task = tokio::spawn(trigger.run());
        parent.cancel();

        assert_eq!(task.await.unwrap(), Some(Trigger::Parent));
        assert!(token.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_external_cancellation_skips_callback() {
        let token = CancellationToken::new();
        let (trigger, calls) = counting_trigger(CancellationToken::new(), token.clone());

        let task = tokio::spawn(trigger.run());
        token.cancel();

        assert_eq!(task.await.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_callback_still_cancels() {
        let token = CancellationToken::new();
        let callback: Callback = Arc::new(|| panic!("callback failure"));
        let trigger = ShutdownTrigger::new(
            CancellationToken::new(),
            token.clone(),
            Vec::new(),
            Some(callback),
        );
        let handle = trigger.handle();

        let task = tokio::spawn(trigger.run());
        handle.send(Signal::Terminate);

        assert_eq!(task.await.unwrap(), Some(Trigger::Signal(Signal::Terminate)));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(Trigger::Signal(Signal::Quit).to_string(), "signal quit");
        assert_eq!(Trigger::Parent.to_string(), "parent cancellation");
    }
}
