//! Process plumbing for the server binary.
//!
//! - [`sig_down`] - Graceful shutdown signal handling
//! - [`telemetry`] - Tracing subscriber and optional OTLP export

pub mod sig_down;
pub mod telemetry;

pub use sig_down::*;
pub use telemetry::*;
