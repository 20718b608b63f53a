//! Tabula Telemetry
//!
//! Structured logging for the API layer. Request spans come from
//! `tower_http::trace::TraceLayer` on the router; this module only installs
//! the subscriber they are recorded by.

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
