//! Log record view: the per-event data a formatter reads.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use otelwrap_core::Value;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

// ─── Levels ───────────────────────────────────────────────────────────────────

/// Severity with the conventional numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Handler threshold that lets everything through.
    #[default]
    NotSet = 0,
    Trace = 5,
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Level {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NotSet => "NOTSET",
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn from_tracing(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warning,
            tracing::Level::ERROR => Self::Error,
        }
    }

    /// `EnvFilter` directive for this threshold.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::NotSet | Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notset" | "0" => Ok(Self::NotSet),
            "trace" | "5" => Ok(Self::Trace),
            "debug" | "10" => Ok(Self::Debug),
            "info" | "20" => Ok(Self::Info),
            "warn" | "warning" | "30" => Ok(Self::Warning),
            "error" | "40" => Ok(Self::Error),
            "critical" | "fatal" | "50" => Ok(Self::Critical),
            _ => Err(ConfigError::UnknownLevel(s.to_string())),
        }
    }
}

// ─── Ids ──────────────────────────────────────────────────────────────────────

/// `0x` followed by 32 lowercase hex digits.
pub fn format_trace_id(trace_id: u128) -> String {
    format!("0x{trace_id:032x}")
}

/// `0x` followed by 16 lowercase hex digits.
pub fn format_span_id(span_id: u64) -> String {
    format!("0x{span_id:016x}")
}

// ─── Exceptions ───────────────────────────────────────────────────────────────

/// Captured error with its chain of causes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    #[serde(default)]
    pub causes: Vec<String>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    pub fn from_error<E: StdError + 'static>(err: &E) -> Self {
        let mut info = Self::from_dyn(err);
        info.type_name = std::any::type_name::<E>().to_string();
        info
    }

    /// Capture a type-erased error; the type name is unknown and shown as `Error`.
    pub fn from_dyn(err: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            type_name: "Error".into(),
            message: err.to_string(),
            causes,
        }
    }

    /// Multi-line text for the `exc_text` field.
    pub fn render(&self) -> String {
        let mut out = format!("{}: {}", self.type_name, self.message);
        if !self.causes.is_empty() {
            out.push_str("\n\nCaused by:");
            for (i, cause) in self.causes.iter().enumerate() {
                out.push_str(&format!("\n    {i}: {cause}"));
            }
        }
        out
    }
}

// ─── Record view ──────────────────────────────────────────────────────────────

/// Keys the record always provides; caller attributes never replace them.
pub const RESERVED_KEYS: &[&str] = &[
    "name",
    "msg",
    "args",
    "levelname",
    "levelno",
    "pathname",
    "filename",
    "module",
    "exc_text",
    "lineno",
    "funcName",
    "created",
    "thread",
    "threadName",
    "process",
    "otelTraceID",
    "otelSpanID",
    "otelServiceName",
    "message",
    "asctime",
    "tz_name",
    "tz_utc_offset_seconds",
];

/// Read-only view of one log event.
#[derive(Debug, Clone)]
pub struct LogRecordView {
    /// Message template, `{}` placeholders filled from `args`.
    pub message: String,
    pub args: Vec<Value>,
    pub created: DateTime<Utc>,
    pub level: Level,
    /// Logger name (a `tracing` target).
    pub name: String,
    pub pathname: String,
    pub module: String,
    pub func_name: String,
    pub lineno: u32,
    pub trace_id: u128,
    pub span_id: u64,
    pub service_name: String,
    pub exc_info: Option<ExceptionInfo>,
    pub thread: u64,
    pub thread_name: String,
    pub process: u32,
    /// Caller-attached attributes in insertion order.
    pub extra: Vec<(String, Value)>,
}

impl LogRecordView {
    /// A record stamped with the current time, thread and process.
    pub fn new(level: Level, name: impl Into<String>, message: impl Into<String>) -> Self {
        let current = std::thread::current();
        Self {
            message: message.into(),
            args: Vec::new(),
            created: Utc::now(),
            level,
            name: name.into(),
            pathname: String::new(),
            module: String::new(),
            func_name: String::new(),
            lineno: 0,
            trace_id: 0,
            span_id: 0,
            service_name: String::new(),
            exc_info: None,
            thread: current_thread_number(),
            thread_name: current.name().unwrap_or("unnamed").to_string(),
            process: std::process::id(),
            extra: Vec::new(),
        }
    }

    pub fn with_args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_location(
        mut self,
        pathname: impl Into<String>,
        module: impl Into<String>,
        func_name: impl Into<String>,
        lineno: u32,
    ) -> Self {
        self.pathname = pathname.into();
        self.module = module.into();
        self.func_name = func_name.into();
        self.lineno = lineno;
        self
    }

    pub fn with_trace(mut self, trace_id: u128, span_id: u64) -> Self {
        self.trace_id = trace_id;
        self.span_id = span_id;
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_exception(mut self, info: ExceptionInfo) -> Self {
        self.exc_info = Some(info);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Last path component of `pathname`.
    pub fn filename(&self) -> &str {
        self.pathname
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.pathname.as_str())
    }

    /// Canonical attributes followed by caller extras.
    ///
    /// Formatter-computed keys (`message`, `asctime`, `tz_name`,
    /// `tz_utc_offset_seconds`, `exc_text`) are added by the formatter.
    pub fn attributes(&self) -> IndexMap<String, Value> {
        let mut attrs: IndexMap<String, Value> = IndexMap::new();
        attrs.insert("name".into(), Value::from(self.name.as_str()));
        attrs.insert("msg".into(), Value::from(self.message.as_str()));
        attrs.insert("args".into(), Value::Tuple(self.args.clone()));
        attrs.insert("levelname".into(), Value::from(self.level.name()));
        attrs.insert("levelno".into(), Value::from(self.level.number()));
        attrs.insert("pathname".into(), Value::from(self.pathname.as_str()));
        attrs.insert("filename".into(), Value::from(self.filename()));
        attrs.insert("module".into(), Value::from(self.module.as_str()));
        attrs.insert("lineno".into(), Value::from(self.lineno));
        attrs.insert("funcName".into(), Value::from(self.func_name.as_str()));
        attrs.insert("created".into(), Value::Float(created_seconds(&self.created)));
        attrs.insert("thread".into(), Value::from(self.thread));
        attrs.insert("threadName".into(), Value::from(self.thread_name.as_str()));
        attrs.insert("process".into(), Value::from(self.process));
        attrs.insert("otelTraceID".into(), Value::from(format_trace_id(self.trace_id)));
        attrs.insert("otelSpanID".into(), Value::from(format_span_id(self.span_id)));
        attrs.insert("otelServiceName".into(), Value::from(self.service_name.as_str()));
        for (key, value) in &self.extra {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            attrs.insert(key.clone(), value.clone());
        }
        attrs
    }
}

/// Seconds since the epoch with sub-second precision.
fn created_seconds(created: &DateTime<Utc>) -> f64 {
    created.timestamp() as f64 + f64::from(created.timestamp_subsec_micros()) / 1e6
}

/// Small stable per-thread number.
fn current_thread_number() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static NUMBER: u64 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    NUMBER.with(|n| *n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("query failed")]
    struct QueryError {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn trace_ids_are_padded_hex() {
        assert_eq!(format_trace_id(48879), "0x0000000000000000000000000000beef");
        assert_eq!(format_span_id(48879), "0x000000000000beef");
        assert_eq!(format_trace_id(0).len(), 34);
    }

    #[test]
    fn level_numbers_and_parsing() {
        assert_eq!(Level::Warning.number(), 30);
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("CRITICAL".parse::<Level>().unwrap(), Level::Critical);
        assert!("loud".parse::<Level>().is_err());
        assert!(Level::Debug < Level::Info);
        assert_eq!(format!("{:<8}|", Level::Info), "INFO    |");
    }

    #[test]
    fn exception_chain_is_rendered() {
        let err = QueryError {
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out"),
        };
        let info = ExceptionInfo::from_error(&err);
        assert!(info.type_name.ends_with("QueryError"));
        assert_eq!(info.causes, vec!["socket timed out".to_string()]);
        let text = info.render();
        assert!(text.contains(": query failed"));
        assert!(text.contains("0: socket timed out"));
    }

    #[test]
    fn attributes_keep_reserved_keys() {
        let record = LogRecordView::new(Level::Info, "app", "hello")
            .with_location("src/app/main.rs", "app::main", "run", 12)
            .with_extra("user", "ada")
            .with_extra("levelname", "SPOOFED");
        let attrs = record.attributes();
        assert!(matches!(attrs.get("levelname"), Some(Value::Str(s)) if s == "INFO"));
        assert!(matches!(attrs.get("filename"), Some(Value::Str(s)) if s == "main.rs"));
        assert!(matches!(attrs.get("user"), Some(Value::Str(s)) if s == "ada"));
        assert_eq!(attrs.get_index(0).map(|(k, _)| k.as_str()), Some("name"));
    }
}
