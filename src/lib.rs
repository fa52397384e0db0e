//! Process lifecycle engine.
//!
//! Starts a set of registered hooks, blocks until a shutdown is requested by
//! a signal or a parent cancellation token, then stops every hook within a
//! bounded grace period.

pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::EngineConfig;
pub use lifecycle::{Engine, EngineError, Hook};
