//! Line-oriented log handler and the process-wide handler cache.
//!
//! A handler owns one destination (stderr, an appended file, or a shared
//! stream) and a minimum level. [`get_json_handler`] returns the same
//! `Arc<JsonHandler>` for the same (level, destination) pair, so repeated
//! setup calls never attach duplicate writers.

use crate::error::ConfigError;
use crate::formatter::{JsonFormatter, RecordFormatter};
use crate::record::{Level, LogRecordView};
use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::warn;

/// A writer shared between the caller and a handler.
pub type SharedStream = Arc<Mutex<dyn Write + Send>>;

/// Wrap any writer as a [`SharedStream`].
pub fn shared_stream<W: Write + Send + 'static>(writer: W) -> SharedStream {
    Arc::new(Mutex::new(writer))
}

/// Level and destination of a handler. `path` and `stream` are exclusive;
/// with neither set, lines go to stderr.
#[derive(Clone, Default)]
pub struct HandlerConfig {
    pub level: Level,
    pub path: Option<PathBuf>,
    pub stream: Option<SharedStream>,
}

impl HandlerConfig {
    pub fn stderr(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn file(level: Level, path: impl Into<PathBuf>) -> Self {
        Self {
            level,
            path: Some(path.into()),
            stream: None,
        }
    }

    pub fn stream(level: Level, stream: SharedStream) -> Self {
        Self {
            level,
            path: None,
            stream: Some(stream),
        }
    }

    fn destination(&self) -> Result<Destination, ConfigError> {
        match (&self.path, &self.stream) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingDestinations),
            (Some(path), None) => Ok(Destination::File(path.clone())),
            (None, Some(stream)) => Ok(Destination::Stream(Arc::as_ptr(stream) as *const () as usize)),
            (None, None) => Ok(Destination::Stderr),
        }
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("level", &self.level)
            .field("path", &self.path)
            .field("stream", &self.stream.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// Cache identity of a destination. Streams are identified by address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Destination {
    Stderr,
    File(PathBuf),
    Stream(usize),
}

enum Sink {
    Stderr,
    File(File),
    Stream(SharedStream),
}

impl Sink {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        match self {
            Sink::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(line)?;
                err.flush()
            }
            Sink::File(file) => {
                file.write_all(line)?;
                file.flush()
            }
            Sink::Stream(stream) => {
                let mut writer = lock(stream);
                writer.write_all(line)?;
                writer.flush()
            }
        }
    }
}

/// Lock ignoring poisoning: a panic in another writer leaves the sink usable.
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─── Handler ──────────────────────────────────────────────────────────────────

/// Formats records and writes one line per record to its destination.
pub struct JsonHandler {
    level: Level,
    formatter: Box<dyn RecordFormatter>,
    sink: Mutex<Sink>,
    write_errors: AtomicU64,
}

impl JsonHandler {
    /// Build an uncached handler with the default [`JsonFormatter`].
    pub fn new(config: &HandlerConfig) -> Result<Self, ConfigError> {
        let sink = match config.destination()? {
            Destination::Stderr => Sink::Stderr,
            Destination::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|source| ConfigError::OpenFile { path, source })?;
                Sink::File(file)
            }
            Destination::Stream(_) => match &config.stream {
                Some(stream) => Sink::Stream(stream.clone()),
                None => Sink::Stderr,
            },
        };
        Ok(Self {
            level: config.level,
            formatter: Box::new(JsonFormatter::default()),
            sink: Mutex::new(sink),
            write_errors: AtomicU64::new(0),
        })
    }

    /// Replace the formatter.
    pub fn with_formatter(mut self, formatter: impl RecordFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Format and write `record` if it passes the level threshold.
    ///
    /// Write failures are counted, and the first one is reported as a
    /// warning; nothing propagates to the caller.
    pub fn handle(&self, record: &LogRecordView) {
        if !self.enabled(record.level) {
            return;
        }
        let mut line = self.formatter.format(record);
        line.push('\n');

        let result = lock(&self.sink).write_line(line.as_bytes());
        if let Err(e) = result {
            if self.write_errors.fetch_add(1, Ordering::Relaxed) == 0 {
                warn!(error = %e, "failed to write log line");
            }
        }
    }

    /// Number of lines that could not be written.
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for JsonHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonHandler")
            .field("level", &self.level)
            .field("write_errors", &self.write_errors())
            .finish()
    }
}

// ─── Cache ────────────────────────────────────────────────────────────────────

type HandlerCache = Mutex<HashMap<(Level, Destination), Arc<JsonHandler>>>;

fn cache() -> &'static HandlerCache {
    static CACHE: OnceLock<HandlerCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Shared JSON handler for `config`, created on first request.
pub fn get_json_handler(config: &HandlerConfig) -> Result<Arc<JsonHandler>, ConfigError> {
    let key = (config.level, config.destination()?);
    let mut handlers = lock(cache());
    if let Some(handler) = handlers.get(&key) {
        return Ok(handler.clone());
    }
    let handler = Arc::new(JsonHandler::new(config)?);
    handlers.insert(key, handler.clone());
    Ok(handler)
}
