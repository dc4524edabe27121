//! # otelwrap-core
//!
//! Converts arbitrary runtime values into JSON for structured logging, with
//! the guarantee that encoding never fails.
//!
//! - [`Value`] — dynamic input tree; opaque types implement [`Object`]
//! - [`TypeEncoderRegistry`] — exact-type and capability-matched encoders
//! - [`StructuralEncoder`] — the recursive walk with filtering and aliasing
//! - [`FallbackChain`] — last-resort degrade path
//!
//! ```
//! use otelwrap_core::{jsonable, Value};
//!
//! let v = Value::map([(1i64, "a"), (2i64, "b")]);
//! assert_eq!(jsonable(&v), serde_json::json!({"1": "a", "2": "b"}));
//! ```

pub mod encoder;
pub mod error;
pub mod fallback;
pub mod object;
pub mod overrides;
pub mod registry;
pub mod selector;
pub mod value;

pub use encoder::{
    encode, float_to_json, jsonable, EncodedValue, StructuralEncoder, DEFAULT_MAX_DEPTH,
    MAX_DEPTH_MARKER,
};
pub use error::{catch_quietly, guarded, in_quiet_section, panic_message, EncodeError};
pub use fallback::{Degraded, FallbackChain};
pub use object::{object_identity, Capabilities, Object};
pub use overrides::EncoderOverrides;
pub use registry::{TypeEncoder, TypeEncoderRegistry};
pub use selector::{FieldSelector, FieldSet};
pub use value::{
    CodeKind, CodeRef, EnumMember, LazySeq, Record, TypeKey, Value, ValueKind, UNENCODABLE,
};
