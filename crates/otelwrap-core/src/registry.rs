//! Type encoder registry — maps runtime types to encoder functions.
//!
//! Lookup is two-stage: an exact-type table keyed by [`TypeKey`], then an
//! ordered list of capability groups (predicate + encoder) evaluated in
//! registration order, first match wins. The registry is built before use
//! and read-only afterwards; the process-wide instance is created lazily on
//! first access.

use crate::error::EncodeError;
use crate::value::{TypeKey, Value, ValueKind};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

type EncodeFn = dyn Fn(&Value) -> Result<Value, EncodeError> + Send + Sync;
type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A named function converting one recognised value into another value.
///
/// The result does not have to be flat: the encoder walks it again.
#[derive(Clone)]
pub struct TypeEncoder {
    name: String,
    func: Arc<EncodeFn>,
}

impl TypeEncoder {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, EncodeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Encoder for a concrete `Object` type; the value is downcast first.
    pub fn for_type<T, F>(name: impl Into<String>, func: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value, EncodeError> + Send + Sync + 'static,
    {
        Self::new(name, move |value: &Value| match value.downcast_ref::<T>() {
            Some(inner) => func(inner),
            None => Err(EncodeError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                got: value.type_name(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: &Value) -> Result<Value, EncodeError> {
        (self.func)(value)
    }
}

impl fmt::Debug for TypeEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEncoder").field("name", &self.name).finish()
    }
}

struct CapabilityGroup {
    name: String,
    predicate: Arc<PredicateFn>,
    encoder: TypeEncoder,
}

/// Exact-type table plus ordered capability groups.
pub struct TypeEncoderRegistry {
    by_type: HashMap<TypeKey, TypeEncoder>,
    by_capability: Vec<CapabilityGroup>,
}

impl TypeEncoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            by_type: HashMap::new(),
            by_capability: Vec::new(),
        }
    }

    /// A registry pre-populated with the built-in encoders.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::install(&mut registry);
        registry
    }

    /// The shared process-wide registry (built-ins only).
    pub fn global() -> &'static TypeEncoderRegistry {
        static GLOBAL: OnceLock<TypeEncoderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Register an exact-type encoder; replaces any previous one for `key`.
    pub fn register(&mut self, key: TypeKey, encoder: TypeEncoder) -> &mut Self {
        self.by_type.insert(key, encoder);
        self
    }

    /// Register an encoder for a concrete `Object` type.
    pub fn register_type<T, F>(&mut self, func: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value, EncodeError> + Send + Sync + 'static,
    {
        let encoder = TypeEncoder::for_type::<T, F>(std::any::type_name::<T>(), func);
        self.register(TypeKey::of::<T>(), encoder)
    }

    /// Register an encoder for a structural value kind.
    pub fn register_kind<F>(&mut self, kind: ValueKind, func: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Value, EncodeError> + Send + Sync + 'static,
    {
        self.register(TypeKey::Kind(kind), TypeEncoder::new(kind.to_string(), func))
    }

    /// Append a capability group. Groups are tried in registration order.
    pub fn register_capability<P, F>(
        &mut self,
        name: impl Into<String>,
        predicate: P,
        func: F,
    ) -> &mut Self
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
        F: Fn(&Value) -> Result<Value, EncodeError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.by_capability.push(CapabilityGroup {
            encoder: TypeEncoder::new(name.clone(), func),
            name,
            predicate: Arc::new(predicate),
        });
        self
    }

    /// Find the encoder for `value`: exact type first, then capability groups.
    pub fn lookup(&self, value: &Value) -> Option<&TypeEncoder> {
        if let Some(encoder) = self.by_type.get(&value.type_key()) {
            return Some(encoder);
        }
        self.by_capability
            .iter()
            .find(|group| (group.predicate)(value))
            .map(|group| &group.encoder)
    }

    /// Names of the capability groups, in evaluation order.
    pub fn capability_names(&self) -> Vec<&str> {
        self.by_capability.iter().map(|g| g.name.as_str()).collect()
    }

    /// Total number of registered encoders.
    pub fn len(&self) -> usize {
        self.by_type.len() + self.by_capability.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TypeEncoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeEncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEncoderRegistry")
            .field("exact", &self.by_type.len())
            .field("capabilities", &self.capability_names())
            .finish()
    }
}

// ─── Built-in encoders ────────────────────────────────────────────────────────

pub mod builtins {
    //! Encoders for the foreign types `otelwrap-core` knows about.

    use super::TypeEncoderRegistry;
    use crate::error::EncodeError;
    use crate::value::{Value, ValueKind};
    use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal::Decimal;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
    use std::path::PathBuf;
    use std::time::Duration;

    pub(super) fn install(registry: &mut TypeEncoderRegistry) {
        // Dates and times → ISO-8601 text
        registry
            .register_type::<NaiveDate, _>(|d| Ok(Value::Str(d.format("%Y-%m-%d").to_string())))
            .register_type::<NaiveDateTime, _>(|dt| {
                Ok(Value::Str(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            })
            .register_type::<NaiveTime, _>(|t| Ok(Value::Str(t.format("%H:%M:%S%.f").to_string())))
            .register_type::<DateTime<Utc>, _>(|dt| Ok(Value::Str(iso_datetime(dt))))
            .register_type::<DateTime<FixedOffset>, _>(|dt| Ok(Value::Str(iso_datetime(dt))))
            .register_type::<DateTime<Local>, _>(|dt| Ok(Value::Str(iso_datetime(dt))));

        // Durations → elapsed seconds
        registry
            .register_type::<TimeDelta, _>(|d| Ok(Value::Float(delta_seconds(d))))
            .register_type::<Duration, _>(|d| Ok(Value::Float(d.as_secs_f64())));

        registry.register_type::<Decimal, _>(decimal_number);

        // Byte sequences → decoded text
        registry
            .register_kind(ValueKind::Bytes, |v| match v {
                Value::Bytes(b) => decode_utf8(b),
                other => Err(EncodeError::TypeMismatch {
                    expected: "bytes".into(),
                    got: other.type_name(),
                }),
            })
            .register_type::<bytes::Bytes, _>(|b| decode_utf8(b));

        // Path-like and network-address-like → string form
        registry
            .register_type::<PathBuf, _>(|p| Ok(Value::Str(p.to_string_lossy().into_owned())))
            .register_type::<IpAddr, _>(|a| Ok(Value::Str(a.to_string())))
            .register_type::<Ipv4Addr, _>(|a| Ok(Value::Str(a.to_string())))
            .register_type::<Ipv6Addr, _>(|a| Ok(Value::Str(a.to_string())))
            .register_type::<SocketAddr, _>(|a| Ok(Value::Str(a.to_string())))
            .register_type::<uuid::Uuid, _>(|u| Ok(Value::Str(u.hyphenated().to_string())));

        // Patterns → source text
        registry.register_type::<regex::Regex, _>(|re| Ok(Value::Str(re.as_str().to_string())));

        // Capability groups
        registry
            .register_capability(
                "enumeration member",
                |v| matches!(v, Value::Enum(_)),
                |v| match v {
                    Value::Enum(member) => Ok((*member.value).clone()),
                    other => Err(EncodeError::TypeMismatch {
                        expected: "enum".into(),
                        got: other.type_name(),
                    }),
                },
            )
            .register_capability(
                "unordered collection",
                |v| matches!(v, Value::Set(_)),
                |v| match v {
                    Value::Set(items) => Ok(Value::List(items.clone())),
                    other => Err(EncodeError::TypeMismatch {
                        expected: "set".into(),
                        got: other.type_name(),
                    }),
                },
            );
    }

    fn iso_datetime<Tz: chrono::TimeZone>(dt: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }

    fn delta_seconds(d: &TimeDelta) -> f64 {
        match d.num_nanoseconds() {
            Some(ns) => ns as f64 / 1e9,
            None => d.num_milliseconds() as f64 / 1e3,
        }
    }

    /// Integer when the decimal has no fractional digits, float otherwise.
    fn decimal_number(d: &Decimal) -> Result<Value, EncodeError> {
        if d.scale() == 0 {
            if let Some(i) = d.to_i64() {
                return Ok(Value::Int(i));
            }
            if let Some(u) = d.to_u64() {
                return Ok(Value::UInt(u));
            }
        }
        d.to_f64().map(Value::Float).ok_or_else(|| EncodeError::OutOfRange {
            reason: format!("decimal {d} does not fit a float"),
        })
    }

    fn decode_utf8(bytes: &[u8]) -> Result<Value, EncodeError> {
        std::str::from_utf8(bytes)
            .map(|s| Value::Str(s.to_string()))
            .map_err(|e| EncodeError::InvalidUtf8 {
                reason: e.to_string(),
            })
    }
}
