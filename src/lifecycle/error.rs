//! Error types for the lifecycle engine.

use std::any::Any;
use std::time::Duration;

/// Boxed error returned by hook implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a single `start` or `stop` call.
pub type Outcome = Result<(), HookError>;

/// Failure raised by a hook while starting or stopping.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The hook returned an error.
    #[error("{0}")]
    Failed(#[source] BoxError),

    /// The hook panicked; the payload is rendered as text.
    #[error("Hook has crashed: {0}")]
    Crashed(String),
}

impl HookError {
    /// Convert a panic payload caught by `catch_unwind` into a crash error.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        HookError::Crashed(message)
    }

    /// Whether this error comes from a recovered panic.
    pub fn is_crash(&self) -> bool {
        matches!(self, HookError::Crashed(_))
    }
}

impl From<BoxError> for HookError {
    fn from(err: BoxError) -> Self {
        HookError::Failed(err)
    }
}

/// Errors surfaced by the engine, either returned from `Engine::start` or
/// forwarded to the error reporter.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A hook failed before it was asked to stop. Fatal for the run.
    #[error("startup failed: {source}")]
    Startup {
        hook: String,
        #[source]
        source: HookError,
    },

    /// A hook failed while stopping, or its start failed after stop was requested.
    #[error("shutdown failed: {source}")]
    Shutdown {
        hook: String,
        #[source]
        source: HookError,
    },
}

impl EngineError {
    /// Name of the hook this error originates from.
    pub fn hook(&self) -> &str {
        match self {
            EngineError::Startup { hook, .. } | EngineError::Shutdown { hook, .. } => hook,
        }
    }

    /// Underlying hook failure.
    pub fn hook_error(&self) -> &HookError {
        match self {
            EngineError::Startup { source, .. } | EngineError::Shutdown { source, .. } => source,
        }
    }
}

/// Invalid engine configuration. No engine is created when this is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout {0:?}: must be positive and not equal zero")]
    InvalidTimeout(Duration),

    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<crate::config::validation::ValidationError>),
}

fn join_errors(errors: &[crate::config::validation::ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
