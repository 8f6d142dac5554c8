//! ESTATE Telemetry - Logging Setup
//!
//! Installs the `tracing` subscriber that cache hits, misses and absorbed
//! store failures are reported through.

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig, TelemetryError};
