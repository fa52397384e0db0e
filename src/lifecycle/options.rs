//! Construction options for the engine.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::lifecycle::error::{ConfigError, EngineError};
use crate::lifecycle::signals::{Signal, DEFAULT_SIGNALS};

/// Default (and maximum) time the engine waits for a hook to shut down.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Zero-argument callback run around shutdown.
pub type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Receives every error observed while starting or stopping hooks.
///
/// Calls are serialized, so the callback never runs concurrently with itself.
#[derive(Clone)]
pub struct ErrorReporter {
    handler: Arc<dyn Fn(&EngineError) + Send + Sync + 'static>,
    serial: Arc<Mutex<()>>,
}

impl ErrorReporter {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&EngineError) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            serial: Arc::new(Mutex::new(())),
        }
    }

    /// Hand `err` to the handler. A panicking handler is logged and ignored.
    pub fn report(&self, err: &EngineError) {
        let _guard = self.serial.lock().unwrap_or_else(|e| e.into_inner());
        if catch_unwind(AssertUnwindSafe(|| (self.handler)(err))).is_err() {
            tracing::error!(hook = %err.hook(), error = %err, "Error reporter panicked");
        }
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter").finish_non_exhaustive()
    }
}

/// A single configuration change applied when building an engine.
pub enum EngineOption {
    /// Maximum time to wait for a hook to shut down. Must be positive.
    Timeout(Duration),
    /// Listen for an additional signal. Duplicates are ignored.
    AddSignal(Signal),
    /// Do not listen for any signal; only the parent token triggers shutdown.
    DisableSignals,
    /// Run once, right before hooks are told to stop.
    BeforeShutdown(Callback),
    /// Run once, after every hook has stopped or been abandoned.
    AfterShutdown(Callback),
    /// Receive startup and shutdown errors.
    ErrorReporter(ErrorReporter),
}

impl fmt::Debug for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineOption::Timeout(d) => f.debug_tuple("Timeout").field(d).finish(),
            EngineOption::AddSignal(s) => f.debug_tuple("AddSignal").field(s).finish(),
            EngineOption::DisableSignals => f.write_str("DisableSignals"),
            EngineOption::BeforeShutdown(_) => f.write_str("BeforeShutdown(..)"),
            EngineOption::AfterShutdown(_) => f.write_str("AfterShutdown(..)"),
            EngineOption::ErrorReporter(_) => f.write_str("ErrorReporter(..)"),
        }
    }
}

pub fn timeout(timeout: Duration) -> EngineOption {
    EngineOption::Timeout(timeout)
}

pub fn add_signal(signal: Signal) -> EngineOption {
    EngineOption::AddSignal(signal)
}

pub fn disable_signals() -> EngineOption {
    EngineOption::DisableSignals
}

pub fn before_shutdown<F>(callback: F) -> EngineOption
where
    F: Fn() + Send + Sync + 'static,
{
    EngineOption::BeforeShutdown(Arc::new(callback))
}

pub fn after_shutdown<F>(callback: F) -> EngineOption
where
    F: Fn() + Send + Sync + 'static,
{
    EngineOption::AfterShutdown(Arc::new(callback))
}

pub fn error_reporter<F>(handler: F) -> EngineOption
where
    F: Fn(&EngineError) + Send + Sync + 'static,
{
    EngineOption::ErrorReporter(ErrorReporter::new(handler))
}

/// Resolved settings, built from defaults plus every applied option.
#[derive(Clone)]
pub(crate) struct Settings {
    pub timeout: Duration,
    pub signals: Vec<Signal>,
    pub before_shutdown: Option<Callback>,
    pub after_shutdown: Option<Callback>,
    pub reporter: Option<ErrorReporter>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            signals: DEFAULT_SIGNALS.to_vec(),
            before_shutdown: None,
            after_shutdown: None,
            reporter: None,
        }
    }
}

impl Settings {
    pub fn apply(&mut self, option: EngineOption) -> Result<(), ConfigError> {
        match option {
            EngineOption::Timeout(timeout) => {
                if timeout.is_zero() {
                    return Err(ConfigError::InvalidTimeout(timeout));
                }
                self.timeout = timeout;
            }
            EngineOption::AddSignal(signal) => {
                if !self.signals.contains(&signal) {
                    self.signals.push(signal);
                }
            }
            EngineOption::DisableSignals => self.signals.clear(),
            EngineOption::BeforeShutdown(callback) => self.before_shutdown = Some(callback),
            EngineOption::AfterShutdown(callback) => self.after_shutdown = Some(callback),
            EngineOption::ErrorReporter(reporter) => self.reporter = Some(reporter),
        }
        Ok(())
    }

    pub fn report(&self, err: &EngineError) {
        if let Some(reporter) = &self.reporter {
            reporter.report(err);
        }
    }
}
