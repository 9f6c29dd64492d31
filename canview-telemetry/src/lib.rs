//! # canview Telemetry
//!
//! Crate for logging and metrics shared by every canview process.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::{MetricsRecorder, TelemetryError};
