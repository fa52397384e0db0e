//! Shared utilities for engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lifecycle_engine::lifecycle::{BoxError, EngineError, Hook};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// A hook recording every lifecycle transition.
///
/// By default `start` blocks until `stop` releases it, like a service that
/// only returns once told to.
#[derive(Default)]
pub struct TestHook {
    name: String,
    kill: Notify,
    start_called: AtomicUsize,
    start_done: AtomicBool,
    stop_called: AtomicUsize,
    stop_done: AtomicBool,
    start_error: Option<&'static str>,
    stop_error: Option<&'static str>,
    panic_on_start: bool,
    panic_on_stop: bool,
    stop_hangs: bool,
}

impl TestHook {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// `start` fails immediately with `message`.
    pub fn with_start_error(mut self, message: &'static str) -> Self {
        self.start_error = Some(message);
        self
    }

    /// `stop` releases `start`, then fails with `message`.
    pub fn with_stop_error(mut self, message: &'static str) -> Self {
        self.stop_error = Some(message);
        self
    }

    pub fn panic_on_start(mut self) -> Self {
        self.panic_on_start = true;
        self
    }

    pub fn panic_on_stop(mut self) -> Self {
        self.panic_on_stop = true;
        self
    }

    /// `stop` never returns and never releases `start`.
    pub fn stop_hangs(mut self) -> Self {
        self.stop_hangs = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn start_calls(&self) -> usize {
        self.start_called.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_called.load(Ordering::SeqCst)
    }

    pub fn start_done(&self) -> bool {
        self.start_done.load(Ordering::SeqCst)
    }

    pub fn stop_done(&self) -> bool {
        self.stop_done.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Hook for TestHook {
    async fn start(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        self.start_called.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_start {
            panic!("0xDEADC0DE");
        }
        if let Some(message) = self.start_error {
            self.start_done.store(true, Ordering::SeqCst);
            return Err(message.into());
        }
        self.kill.notified().await;
        self.start_done.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        self.stop_called.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_stop {
            panic!("0xDEADC0DE");
        }
        if self.stop_hangs {
            std::future::pending::<()>().await;
        }
        self.kill.notify_one();
        self.stop_done.store(true, Ordering::SeqCst);
        match self.stop_error {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A hook whose work is done as soon as `start` returns; `stop` is never owed.
#[derive(Default)]
pub struct OneShot {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

#[async_trait]
impl Hook for OneShot {
    async fn start(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Err("stop called on a hook that already finished".into())
    }

    fn name(&self) -> &str {
        "oneshot"
    }
}

/// Start then stop, each exactly once, both completed.
pub fn assert_lifecycle(hook: &TestHook) {
    assert_eq!(hook.start_calls(), 1, "{}: start calls", hook.name);
    assert_eq!(hook.stop_calls(), 1, "{}: stop calls", hook.name);
    assert!(hook.start_done(), "{}: start should have completed", hook.name);
    assert!(hook.stop_done(), "{}: stop should have completed", hook.name);
}

/// Started and returned on its own; never asked to stop.
pub fn assert_started_only(hook: &TestHook) {
    assert_eq!(hook.start_calls(), 1, "{}: start calls", hook.name);
    assert_eq!(hook.stop_calls(), 0, "{}: stop must not be called", hook.name);
}

/// Stop was requested but never confirmed.
pub fn assert_stop_abandoned(hook: &TestHook) {
    assert_eq!(hook.start_calls(), 1, "{}: start calls", hook.name);
    assert_eq!(hook.stop_calls(), 1, "{}: stop calls", hook.name);
    assert!(!hook.start_done(), "{}: start should still be blocked", hook.name);
    assert!(!hook.stop_done(), "{}: stop should not have completed", hook.name);
}

/// Collects every error handed to the error reporter.
#[derive(Clone, Default)]
pub struct Reports {
    inner: Arc<Mutex<Vec<String>>>,
}

impl Reports {
    pub fn push(&self, err: &EngineError) {
        self.inner.lock().unwrap().push(err.to_string());
    }

    pub fn messages(&self) -> Vec<String> {
        self.inner.lock().unwrap().clone()
    }
}

/// Assert `actual` is within `[expected, expected + slack)`.
pub fn assert_elapsed(actual: Duration, expected: Duration, slack: Duration) {
    assert!(
        actual >= expected && actual < expected + slack,
        "elapsed {:?}, expected {:?} (+{:?})",
        actual,
        expected,
        slack
    );
}
