//! The hook capability registered on an engine.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::error::BoxError;

/// A component whose lifecycle is driven by the engine.
///
/// `start` runs in its own task and is expected to keep running until the
/// component is told to stop, either through `ctx` or through `stop`.
/// If `start` returns (or panics) before shutdown was requested, the engine
/// treats it as a startup failure when it carries an error, and cancels every
/// other hook.
///
/// `stop` also runs in its own task, possibly while `start` is still in
/// flight. Implementations that share state between the two calls are
/// responsible for their own synchronization.
///
/// Both calls receive the same `ctx`, which is cancelled once shutdown has
/// been requested.
#[async_trait]
pub trait Hook: Send + Sync + 'static {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError>;

    async fn stop(&self, ctx: CancellationToken) -> Result<(), BoxError>;

    /// Name used in logs, metrics and reported errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
