//! Error types for formatter, handler and subscriber setup.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors. Raised only while building formatters, handlers
/// or subscribers, never from a logging call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot log to both a file path and a stream")]
    ConflictingDestinations,

    #[error("Invalid date format '{0}'")]
    InvalidDateFormat(String),

    #[error("Cannot open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown log level '{0}'")]
    UnknownLevel(String),

    #[error("A global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Errors raised while filling `{}` placeholders in a message template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    #[error("Template has {placeholders} placeholders but {args} arguments were given")]
    ArgCount { placeholders: usize, args: usize },

    #[error("Unmatched '{brace}' at byte {position}")]
    UnmatchedBrace { brace: char, position: usize },
}
