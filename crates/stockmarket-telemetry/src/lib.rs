//! Prometheus metrics and structured logging for the stockmarket server and clients.
//!
//! - Prometheus counters and gauges behind the `Metrics` facade
//! - `gather_metrics` for the `/metrics` endpoint
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_client_logging, init_logging, DEFAULT_FILTER};
pub use metrics::{gather_metrics, Metrics};
