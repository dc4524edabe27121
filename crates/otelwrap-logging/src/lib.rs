//! # otelwrap-logging
//!
//! Structured JSON logging on top of `otelwrap-core`.
//!
//! ## Output
//! One JSON object per line. Every record carries `message`, `asctime`,
//! `tz_name`, `tz_utc_offset_seconds`, `levelname`, `levelno`, `name`,
//! source location, `otelTraceID` / `otelSpanID` (`0x`-prefixed hex) and
//! `otelServiceName`, plus the fields attached to the event. Top-level
//! strings over 10,000 characters are truncated.
//!
//! ## Setup
//! [`instrument_logging`] installs a `tracing` subscriber with an
//! `EnvFilter`, the OpenTelemetry layer and [`JsonLogLayer`]. Calling it
//! again is a no-op.

pub mod error;
pub mod formatter;
pub mod handler;
pub mod json;
pub mod layer;
pub mod message;
pub mod record;
pub mod setup;
pub mod truncate;

pub use error::{ConfigError, InterpolationError};
pub use formatter::{JsonFormatter, JsonFormatterBuilder, RecordFormatter, TextFormatter, TextLayout};
pub use handler::{get_json_handler, shared_stream, HandlerConfig, JsonHandler, SharedStream};
pub use json::JsonOptions;
pub use layer::JsonLogLayer;
pub use message::{interpolate, render_message};
pub use record::{format_span_id, format_trace_id, ExceptionInfo, Level, LogRecordView};
pub use setup::{instrument_logging, shutdown, Instrumentation, LogConfig, TracingConfig};
pub use truncate::{TruncationLimits, TRUNCATION_MARKER};
