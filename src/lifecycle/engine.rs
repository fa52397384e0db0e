//! The lifecycle engine.
//!
//! Starts every registered hook, blocks until a shutdown is requested (signal,
//! programmatic interrupt, parent cancellation or a hook failing to start),
//! then stops every hook within the configured timeout.
//!
//! ```no_run
//! # use lifecycle_engine::lifecycle::{Engine, options};
//! # use tokio_util::sync::CancellationToken;
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::new(CancellationToken::new(), [options::timeout(std::time::Duration::from_secs(2))])?;
//! engine.start().await?; // returns once every hook has stopped
//! # Ok(())
//! # }
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::lifecycle::error::{ConfigError, EngineError};
use crate::lifecycle::hook::Hook;
use crate::lifecycle::options::{EngineOption, Settings};
use crate::lifecycle::runtime::HookRuntime;
use crate::lifecycle::shutdown::{InterruptHandle, ShutdownTrigger};
use crate::lifecycle::signals::Signal;
use crate::observability::metrics::{self, Phase};

/// First startup failure of a run. Later failures are reported, never stored.
type Cause = Arc<Mutex<Option<EngineError>>>;

/// Orchestrates the lifecycle of a set of hooks.
///
/// Either every hook starts, or none stays up: the first hook whose `start`
/// fails cancels the run and every other hook is stopped.
pub struct Engine {
    hooks: Vec<Arc<dyn Hook>>,
    settings: Settings,
    token: CancellationToken,
    trigger: ShutdownTrigger,
}

impl Engine {
    /// Create an engine whose run also ends when `parent` is cancelled.
    ///
    /// Fails if any option is invalid.
    pub fn new<I>(parent: CancellationToken, options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = EngineOption>,
    {
        let mut settings = Settings::default();
        for option in options {
            settings.apply(option)?;
        }

        // Independent from `parent`: the trigger observes the parent so that
        // both kinds of shutdown run the before-shutdown callback first.
        let token = CancellationToken::new();
        let trigger = ShutdownTrigger::new(
            parent,
            token.clone(),
            settings.signals.clone(),
            settings.before_shutdown.clone(),
        );

        Ok(Self {
            hooks: Vec::new(),
            settings,
            token,
            trigger,
        })
    }

    /// Create an engine from a validated configuration file, followed by
    /// `extra` options (callbacks cannot come from a file).
    pub fn from_config<I>(
        parent: CancellationToken,
        config: &EngineConfig,
        extra: I,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = EngineOption>,
    {
        Self::new(parent, config.options()?.into_iter().chain(extra))
    }

    /// Attach a hook to the engine's lifecycle.
    pub fn register<H: Hook>(&mut self, hook: H) {
        self.hooks.push(Arc::new(hook));
    }

    /// Attach a hook the caller keeps a handle on.
    pub fn register_shared(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Maximum time the engine waits for a hook to shut down.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    /// Signals that trigger a shutdown.
    pub fn signals(&self) -> &[Signal] {
        self.trigger.signals()
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Handle that requests a shutdown the same way a signal does.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.trigger.handle()
    }

    /// Start every hook and block until all of them have stopped, gracefully
    /// or by being abandoned after the timeout.
    ///
    /// Returns the first startup failure, if any. Shutdown failures only go to
    /// the error reporter.
    pub async fn start(self) -> Result<(), EngineError> {
        let Engine {
            hooks,
            settings,
            token,
            trigger,
        } = self;

        tracing::info!(
            hooks = hooks.len(),
            timeout = ?settings.timeout,
            signals = ?trigger.signals(),
            "Engine starting"
        );

        let trigger_task = tokio::spawn(trigger.run());

        let settings = Arc::new(settings);
        let cause: Cause = Arc::new(Mutex::new(None));
        let mut supervisors = JoinSet::new();

        for hook in hooks {
            supervisors.spawn(supervise(
                hook,
                token.clone(),
                Arc::clone(&settings),
                Arc::clone(&cause),
            ));
        }

        while let Some(result) = supervisors.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Hook supervisor terminated abnormally");
            }
        }

        // Every hook is done; stop listening for signals.
        trigger_task.abort();
        if let Ok(Some(trigger)) = trigger_task.await {
            tracing::debug!(trigger = %trigger, "Shutdown trigger fired");
        }

        if let Some(callback) = &settings.after_shutdown {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                tracing::error!("After-shutdown callback panicked");
            }
        }

        let cause = cause.lock().unwrap_or_else(|e| e.into_inner()).take();
        match cause {
            Some(err) => {
                tracing::info!(error = %err, "Engine stopped after startup failure");
                Err(err)
            }
            None => {
                tracing::info!("Engine stopped");
                Ok(())
            }
        }
    }
}

/// Drive one hook through its lifecycle and report what went wrong.
async fn supervise(
    hook: Arc<dyn Hook>,
    token: CancellationToken,
    settings: Arc<Settings>,
    cause: Cause,
) {
    let name = hook.name().to_string();
    let mut runtime = HookRuntime::new(name.clone());
    metrics::record_hook_started(&name);

    if let Err(source) = runtime.wait_for_event(&token, &hook).await {
        metrics::record_hook_failure(&name, Phase::Start);
        let err = EngineError::Startup {
            hook: name.clone(),
            source,
        };
        tracing::error!(hook = %name, error = %err, "Hook failed to start, shutting down every hook");
        token.cancel();

        let mut slot = cause.lock().unwrap_or_else(|e| e.into_inner());
        settings.report(&err);
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    let stopping = Instant::now();
    for source in runtime.shutdown(settings.timeout).await {
        metrics::record_hook_failure(&name, Phase::Stop);
        let err = EngineError::Shutdown {
            hook: name.clone(),
            source,
        };
        tracing::warn!(hook = %name, error = %err, "Hook failed to shut down cleanly");
        settings.report(&err);
    }
    metrics::record_shutdown_duration(&name, stopping);

    tracing::debug!(hook = %name, "Hook supervisor finished");
}
