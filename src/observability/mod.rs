//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine, hook runtimes and the shutdown trigger produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
