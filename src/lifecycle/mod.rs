//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Engine::start (engine.rs):
//!     spawn ShutdownTrigger → spawn one supervisor per hook → join all
//!
//! Per hook (runtime.rs):
//!     start task ─┬─ start returns first → startup failure? cancel everyone
//!                 └─ token cancelled first → stop task → collect within timeout
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM/SIGQUIT, InterruptHandle or parent cancellation
//!         → before-shutdown callback → cancel shared token (once)
//! ```
//!
//! # Design Decisions
//! - All hooks start concurrently and stop concurrently; no ordering
//! - Shutdown has a timeout: hooks that miss it are abandoned, not killed
//! - Only the first startup failure is returned; everything else goes to
//!   the error reporter

pub mod engine;
pub mod error;
pub mod hook;
pub mod options;
pub mod runtime;
pub mod shutdown;
pub mod signals;

pub use engine::Engine;
pub use error::{BoxError, ConfigError, EngineError, HookError};
pub use hook::Hook;
pub use options::{EngineOption, ErrorReporter, DEFAULT_TIMEOUT};
pub use shutdown::{InterruptHandle, Trigger};
pub use signals::{Signal, DEFAULT_SIGNALS};
