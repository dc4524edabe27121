//! Caller-supplied encoder overrides.
//!
//! Overrides are consulted before every built-in rule. Unlike registry
//! encoders they return the final JSON value, which is emitted as-is.

use crate::error::EncodeError;
use crate::value::{TypeKey, Value, ValueKind};
use serde_json::Value as EncodedValue;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type OverrideFn = dyn Fn(&Value) -> Result<EncodedValue, EncodeError> + Send + Sync;
type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// Custom encoders keyed by exact type, plus predicate-matched ones in the
/// order they were added.
#[derive(Clone, Default)]
pub struct EncoderOverrides {
    exact: HashMap<TypeKey, Arc<OverrideFn>>,
    by_capability: Vec<(Arc<PredicateFn>, Arc<OverrideFn>)>,
}

impl EncoderOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type<T, F>(mut self, func: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<EncodedValue, EncodeError> + Send + Sync + 'static,
    {
        let wrapped = move |value: &Value| match value.downcast_ref::<T>() {
            Some(inner) => func(inner),
            None => Err(EncodeError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                got: value.type_name(),
            }),
        };
        self.exact.insert(TypeKey::of::<T>(), Arc::new(wrapped));
        self
    }

    pub fn with_kind<F>(mut self, kind: ValueKind, func: F) -> Self
    where
        F: Fn(&Value) -> Result<EncodedValue, EncodeError> + Send + Sync + 'static,
    {
        self.exact.insert(TypeKey::Kind(kind), Arc::new(func));
        self
    }

    pub fn with_capability<P, F>(mut self, predicate: P, func: F) -> Self
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
        F: Fn(&Value) -> Result<EncodedValue, EncodeError> + Send + Sync + 'static,
    {
        self.by_capability.push((Arc::new(predicate), Arc::new(func)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.by_capability.is_empty()
    }

    /// Apply the matching override, if any.
    ///
    /// Returns `None` when nothing matched. A matching override that fails
    /// yields `Some(Err(_))`; the caller moves on to the built-in rules.
    pub(crate) fn apply(&self, value: &Value) -> Option<Result<EncodedValue, EncodeError>> {
        if let Some(func) = self.exact.get(&value.type_key()) {
            return Some(func(value));
        }
        self.by_capability
            .iter()
            .find(|(predicate, _)| predicate(value))
            .map(|(_, func)| func(value))
    }
}

impl fmt::Debug for EncoderOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderOverrides")
            .field("exact", &self.exact.len())
            .field("capabilities", &self.by_capability.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_before_capability() {
        let overrides = EncoderOverrides::new()
            .with_capability(|_| true, |_| Ok(json!("capability")))
            .with_kind(ValueKind::Int, |_| Ok(json!("exact")));
        assert_eq!(overrides.apply(&Value::Int(1)).unwrap().unwrap(), json!("exact"));
        assert_eq!(overrides.apply(&Value::Null).unwrap().unwrap(), json!("capability"));
    }

    #[test]
    fn capabilities_in_caller_order() {
        let overrides = EncoderOverrides::new()
            .with_capability(|v| v.is_null(), |_| Ok(json!(1)))
            .with_capability(|_| true, |_| Ok(json!(2)));
        assert_eq!(overrides.apply(&Value::Null).unwrap().unwrap(), json!(1));
        assert_eq!(overrides.apply(&Value::Bool(true)).unwrap().unwrap(), json!(2));
    }

    #[test]
    fn no_match_is_none() {
        let overrides = EncoderOverrides::new().with_kind(ValueKind::Str, |_| Ok(json!("s")));
        assert!(overrides.apply(&Value::Int(0)).is_none());
        assert!(EncoderOverrides::new().is_empty());
    }

    #[test]
    fn typed_override_downcasts() {
        let overrides = EncoderOverrides::new()
            .with_type::<uuid::Uuid, _>(|u| Ok(json!({ "uuid": u.simple().to_string() })));
        let v = Value::object(uuid::Uuid::nil());
        assert_eq!(
            overrides.apply(&v).unwrap().unwrap(),
            json!({ "uuid": "00000000000000000000000000000000" })
        );
    }
}
