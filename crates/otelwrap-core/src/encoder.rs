//! StructuralEncoder — walks a [`Value`] graph and produces JSON.
//!
//! Dispatch per node, first match wins:
//!
//! 1. caller override (returned as-is)
//! 2. record / named-field object → mapping
//! 3. enumeration member → its underlying value
//! 4. primitive scalar → unchanged
//! 5. path → string form
//! 6. mapping → filtered, aliased object
//! 7. sequence → array in iteration order
//! 8. registry encoder → result encoded again
//! 9. callable → qualified name
//! 10. fallback chain
//!
//! The walk never fails. Nodes below the depth cap are replaced by
//! [`MAX_DEPTH_MARKER`]; an object met again on its own path becomes
//! `"<cycle: TypeName>"`.

use crate::error::guarded;
use crate::fallback::{Degraded, FallbackChain};
use crate::object::{object_identity, Capabilities};
use crate::overrides::EncoderOverrides;
use crate::registry::TypeEncoderRegistry;
use crate::selector::FieldSelector;
use crate::value::Value;
use serde_json::{Map, Number};
use tracing::{debug, trace};

/// JSON-safe output of the encoder.
pub type EncodedValue = serde_json::Value;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const MAX_DEPTH_MARKER: &str = "<max depth exceeded>";

/// Recursive encoder bound to one registry.
#[derive(Debug, Clone, Copy)]
pub struct StructuralEncoder<'r> {
    registry: &'r TypeEncoderRegistry,
    fallback: FallbackChain,
    max_depth: usize,
}

impl<'r> StructuralEncoder<'r> {
    pub fn new(registry: &'r TypeEncoderRegistry) -> Self {
        Self {
            registry,
            fallback: FallbackChain,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Encode `value` under `selector`, consulting `overrides` first.
    pub fn encode(
        &self,
        value: &Value,
        selector: &FieldSelector,
        overrides: &EncoderOverrides,
    ) -> EncodedValue {
        let mut walk = Walk {
            encoder: self,
            selector,
            overrides,
            path: Vec::new(),
        };
        walk.node(value, 0)
    }
}

/// Encode with the process-wide registry.
pub fn encode(value: &Value, selector: &FieldSelector, overrides: &EncoderOverrides) -> EncodedValue {
    StructuralEncoder::new(TypeEncoderRegistry::global()).encode(value, selector, overrides)
}

/// Encode with the process-wide registry, no filtering and no overrides.
pub fn jsonable(value: &Value) -> EncodedValue {
    encode(value, &FieldSelector::default(), &EncoderOverrides::default())
}

/// JSON number for a float; non-finite values become their conventional names.
pub fn float_to_json(x: f64) -> EncodedValue {
    match Number::from_f64(x) {
        Some(n) => EncodedValue::Number(n),
        None if x.is_nan() => EncodedValue::String("NaN".into()),
        None if x > 0.0 => EncodedValue::String("Infinity".into()),
        None => EncodedValue::String("-Infinity".into()),
    }
}

// ─── Walk state ───────────────────────────────────────────────────────────────

enum MapKey<'v> {
    Name(&'v str),
    Value(&'v Value),
}

/// State for one `encode` call: the identities of objects on the current path.
struct Walk<'e, 'r> {
    encoder: &'e StructuralEncoder<'r>,
    selector: &'e FieldSelector,
    overrides: &'e EncoderOverrides,
    path: Vec<usize>,
}

impl Walk<'_, '_> {
    fn node(&mut self, value: &Value, depth: usize) -> EncodedValue {
        if depth > self.encoder.max_depth {
            return EncodedValue::String(MAX_DEPTH_MARKER.into());
        }

        let Value::Object(obj) = value else {
            return self.dispatch(value, depth);
        };
        let id = object_identity(obj);
        if self.path.contains(&id) {
            trace!(type_name = obj.type_name(), "cycle detected");
            return EncodedValue::String(format!("<cycle: {}>", obj.type_name()));
        }
        self.path.push(id);
        let encoded = self.dispatch(value, depth);
        self.path.pop();
        encoded
    }

    fn dispatch(&mut self, value: &Value, depth: usize) -> EncodedValue {
        let caps = Capabilities::of(value);

        // 1. Overrides
        if !self.overrides.is_empty() {
            match guarded("override", || Ok(self.overrides.apply(value))) {
                Ok(Some(Ok(encoded))) => return encoded,
                Ok(None) => {}
                Ok(Some(Err(e))) | Err(e) => {
                    debug!(type_name = %value.type_name(), error = %e, "override failed")
                }
            }
        }

        // 2. Records
        match value {
            Value::Record(record) => {
                let fields = record.fields.iter().map(|(k, v)| (MapKey::Name(k.as_str()), v));
                return self.mapping(fields, depth);
            }
            Value::Object(obj) if caps.contains(Capabilities::NAMED_FIELDS) => {
                match guarded("fields", || obj.fields()) {
                    Ok(fields) => {
                        let fields = fields.iter().map(|(k, v)| (MapKey::Name(k.as_str()), v));
                        return self.mapping(fields, depth);
                    }
                    Err(e) => debug!(type_name = %value.type_name(), error = %e, "field probe failed"),
                }
            }
            _ => {}
        }

        match value {
            // 3. Enumeration members
            Value::Enum(member) => return self.node(&member.value, depth + 1),

            // 4. Primitives
            Value::Null => return EncodedValue::Null,
            Value::Bool(b) => return EncodedValue::Bool(*b),
            Value::Int(i) => return EncodedValue::from(*i),
            Value::UInt(u) => return EncodedValue::from(*u),
            Value::Float(x) => return float_to_json(*x),
            Value::Str(s) => return EncodedValue::String(s.clone()),

            // 5. Paths
            Value::Path(p) => return EncodedValue::String(p.to_string_lossy().into_owned()),

            // 6. Mappings
            Value::Map(entries) => {
                let entries = entries.iter().map(|(k, v)| (MapKey::Value(k), v));
                return self.mapping(entries, depth);
            }

            // 7. Sequences
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                return self.sequence(items, depth)
            }
            Value::Iter(seq) => match guarded("iterate", || Ok(seq.materialize())) {
                Ok(items) => return self.sequence(&items, depth),
                Err(e) => debug!(name = seq.name(), error = %e, "lazy sequence failed"),
            },
            Value::Object(obj) if caps.contains(Capabilities::SEQUENCE) => {
                match guarded("elements", || obj.elements()) {
                    Ok(items) => return self.sequence(&items, depth),
                    Err(e) => debug!(type_name = %value.type_name(), error = %e, "element probe failed"),
                }
            }
            _ => {}
        }

        // 8. Registry
        let registry = self.encoder.registry;
        if let Some(type_encoder) = registry.lookup(value) {
            match guarded(type_encoder.name(), || type_encoder.apply(value)) {
                Ok(converted) => return self.node(&converted, depth + 1),
                Err(e) => debug!(
                    encoder = type_encoder.name(),
                    error = %e,
                    "registered encoder failed"
                ),
            }
        }

        // 9. Callables
        if let Value::Callable(code) = value {
            return EncodedValue::String(code.qualname.clone());
        }

        // 10. Fallback
        match self.encoder.fallback.degrade(value) {
            Degraded::Entries(entries) => {
                let entries = entries.iter().map(|(k, v)| (MapKey::Value(k), v));
                self.mapping(entries, depth)
            }
            Degraded::Attributes(attrs) => {
                let attrs = attrs.iter().map(|(k, v)| (MapKey::Name(k.as_str()), v));
                self.mapping(attrs, depth)
            }
            Degraded::Text(text) => EncodedValue::String(text),
        }
    }

    fn mapping<'v>(
        &mut self,
        entries: impl Iterator<Item = (MapKey<'v>, &'v Value)>,
        depth: usize,
    ) -> EncodedValue {
        let mut out = Map::new();
        for (key, value) in entries {
            let Some(key) = self.coerce_key(key, depth) else {
                continue;
            };
            let Some(output_key) = self.selector.output_key(&key) else {
                continue;
            };
            if self.selector.exclude_none && value.is_null() {
                continue;
            }
            let output_key = output_key.to_string();
            let encoded = self.node(value, depth + 1);
            out.insert(output_key, encoded);
        }
        EncodedValue::Object(out)
    }

    fn sequence(&mut self, items: &[Value], depth: usize) -> EncodedValue {
        EncodedValue::Array(items.iter().map(|item| self.node(item, depth + 1)).collect())
    }

    /// String form of a mapping key, or `None` to drop the entry.
    fn coerce_key(&mut self, key: MapKey<'_>, depth: usize) -> Option<String> {
        let key = match key {
            MapKey::Name(name) => return Some(name.to_string()),
            MapKey::Value(Value::Str(s)) => return Some(s.clone()),
            MapKey::Value(key) => key,
        };
        match self.node(key, depth + 1) {
            EncodedValue::String(s) => Some(s),
            EncodedValue::Number(n) => Some(n.to_string()),
            EncodedValue::Bool(b) => Some(b.to_string()),
            EncodedValue::Null => Some("null".into()),
            EncodedValue::Array(_) | EncodedValue::Object(_) => {
                debug!(key = %key.repr(), "dropping entry with composite key");
                None
            }
        }
    }
}
