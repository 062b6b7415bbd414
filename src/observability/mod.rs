//! Observability: structured logging and Prometheus metrics.
//!
//! The subscriber and the metrics recorder are process-wide and are
//! installed by the binary, never by the engine itself.

pub mod metrics;
#[cfg(feature = "server")]
mod tracing_init;

#[cfg(feature = "server")]
pub use tracing_init::*;
