//! Error types for the encoding pipeline.
//!
//! None of these ever reach the caller of [`crate::encode`]: they are the
//! explicit success/failure results that capability probes, registry
//! encoders and overrides return, and the encoder recovers from every one of
//! them locally.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use thiserror::Error;

/// Errors raised while converting a single runtime value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{type_name} does not support {probe}")]
    Unsupported {
        type_name: String,
        probe: &'static str,
    },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid UTF-8 in byte sequence: {reason}")]
    InvalidUtf8 { reason: String },

    #[error("Value out of range: {reason}")]
    OutOfRange { reason: String },

    #[error("Panic in {context}: {message}")]
    Panicked { context: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl EncodeError {
    /// Shorthand for a probe the value does not implement.
    pub fn unsupported(type_name: impl Into<String>, probe: &'static str) -> Self {
        Self::Unsupported {
            type_name: type_name.into(),
            probe,
        }
    }

    /// Returns `true` if the error came from a panicking callback.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

thread_local! {
    static QUIET_DEPTH: Cell<usize> = const { Cell::new(0) };
}

static QUIET_HOOK: Once = Once::new();

/// Wrap the current panic hook so it stays silent while this thread is
/// inside [`catch_quietly`]. Panics elsewhere still reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if QUIET_DEPTH.with(Cell::get) == 0 {
                previous(info);
            }
        }));
    });
}

/// `true` while the current thread runs inside [`catch_quietly`].
pub fn in_quiet_section() -> bool {
    QUIET_DEPTH.with(Cell::get) > 0
}

/// `catch_unwind` without the default hook's `panicked at` report on stderr,
/// which would otherwise land between JSON log lines.
pub fn catch_quietly<T>(f: impl FnOnce() -> T) -> std::thread::Result<T> {
    install_quiet_hook();
    QUIET_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    QUIET_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    result
}

/// Run a user-supplied callback, turning a panic into [`EncodeError::Panicked`].
///
/// Probes, registry encoders and overrides are arbitrary caller code; this is
/// the single place where their unwinding is stopped.
pub fn guarded<T>(
    context: &str,
    f: impl FnOnce() -> Result<T, EncodeError>,
) -> Result<T, EncodeError> {
    match catch_quietly(f) {
        Ok(result) => result,
        Err(payload) => Err(EncodeError::Panicked {
            context: context.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Extract the human-readable part of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
