//! Opaque runtime objects and the capability tags they advertise.
//!
//! Any application type can take part in encoding by implementing
//! [`Object`]. The encoder never reflects over an object: it reads the
//! [`Capabilities`] the object declares once, and only calls the probes
//! those tags promise. Every probe returns a `Result`, so an object that
//! cannot answer simply reports failure and the next rule is tried.

use crate::error::EncodeError;
use crate::value::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

// ─── Capabilities ─────────────────────────────────────────────────────────────

/// Closed set of shape tags, resolved once per value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Self = Self(0);
    /// Plain named-field aggregate: `fields()` is meaningful.
    pub const NAMED_FIELDS: Self = Self(1);
    /// Mapping-like: `entries()` yields key/value pairs.
    pub const MAPPING: Self = Self(1 << 1);
    /// Sequence-like: `elements()` yields items in iteration order.
    pub const SEQUENCE: Self = Self(1 << 2);
    /// Attribute bag: `attributes()` yields named attributes.
    pub const ATTRIBUTES: Self = Self(1 << 3);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Resolve the tags for any value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Record(_) => Self::NAMED_FIELDS,
            Value::Map(_) => Self::MAPPING,
            Value::List(_) | Value::Tuple(_) | Value::Set(_) | Value::Iter(_) => Self::SEQUENCE,
            Value::Object(obj) => obj.capabilities(),
            _ => Self::NONE,
        }
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

// ─── Object trait ─────────────────────────────────────────────────────────────

/// Upcast helper so `dyn Object` can be downcast to its concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An opaque runtime object.
///
/// All probes default to "unsupported"; implementors override the ones
/// matching the tags returned from [`Object::capabilities`].
pub trait Object: AsAny + Send + Sync {
    /// Qualified type name, used for diagnostics and cycle markers.
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Named fields, for [`Capabilities::NAMED_FIELDS`].
    fn fields(&self) -> Result<Vec<(String, Value)>, EncodeError> {
        Err(EncodeError::unsupported(self.type_name(), "fields"))
    }

    /// Items in iteration order, for [`Capabilities::SEQUENCE`].
    fn elements(&self) -> Result<Vec<Value>, EncodeError> {
        Err(EncodeError::unsupported(self.type_name(), "elements"))
    }

    /// Key/value pairs, for [`Capabilities::MAPPING`].
    fn entries(&self) -> Result<Vec<(Value, Value)>, EncodeError> {
        Err(EncodeError::unsupported(self.type_name(), "entries"))
    }

    /// Named attributes, for [`Capabilities::ATTRIBUTES`].
    fn attributes(&self) -> Result<Vec<(String, Value)>, EncodeError> {
        Err(EncodeError::unsupported(self.type_name(), "attributes"))
    }

    /// Diagnostic representation, the last resort of the fallback chain.
    fn repr(&self) -> Result<String, EncodeError> {
        Ok(format!("<{} object>", self.type_name()))
    }
}

impl dyn Object {
    /// `TypeId` of the concrete type behind the trait object.
    pub fn object_type_id(&self) -> TypeId {
        Any::type_id(AsAny::as_any(self))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        AsAny::as_any(self).downcast_ref::<T>()
    }
}

/// Address of the object, used as its identity during one encode call.
pub fn object_identity(obj: &Arc<dyn Object>) -> usize {
    Arc::as_ptr(obj) as *const () as usize
}

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.type_name())
    }
}

// ─── Built-in objects ─────────────────────────────────────────────────────────
//
// Foreign types with a registered encoder (see `registry::builtins`). They
// advertise no capabilities; the registry matches them by exact type.

impl Object for chrono::NaiveDate {}
impl Object for chrono::NaiveDateTime {}
impl Object for chrono::NaiveTime {}
impl Object for chrono::DateTime<chrono::Utc> {}
impl Object for chrono::DateTime<chrono::FixedOffset> {}
impl Object for chrono::DateTime<chrono::Local> {}
impl Object for chrono::TimeDelta {}
impl Object for std::time::Duration {}
impl Object for rust_decimal::Decimal {}
impl Object for std::net::IpAddr {}
impl Object for std::net::Ipv4Addr {}
impl Object for std::net::Ipv6Addr {}
impl Object for std::net::SocketAddr {}
impl Object for std::path::PathBuf {}
impl Object for uuid::Uuid {}
impl Object for regex::Regex {}
impl Object for bytes::Bytes {}

// Collections are sequence-like; hash sets yield their own iteration order.

impl<T> Object for HashSet<T>
where
    T: Clone + Into<Value> + Send + Sync + 'static,
{
    fn capabilities(&self) -> Capabilities {
        Capabilities::SEQUENCE
    }

    fn elements(&self) -> Result<Vec<Value>, EncodeError> {
        Ok(self.iter().cloned().map(Into::into).collect())
    }
}

impl<T> Object for BTreeSet<T>
where
    T: Clone + Into<Value> + Send + Sync + 'static,
{
    fn capabilities(&self) -> Capabilities {
        Capabilities::SEQUENCE
    }

    fn elements(&self) -> Result<Vec<Value>, EncodeError> {
        Ok(self.iter().cloned().map(Into::into).collect())
    }
}

impl<T> Object for VecDeque<T>
where
    T: Clone + Into<Value> + Send + Sync + 'static,
{
    fn capabilities(&self) -> Capabilities {
        Capabilities::SEQUENCE
    }

    fn elements(&self) -> Result<Vec<Value>, EncodeError> {
        Ok(self.iter().cloned().map(Into::into).collect())
    }
}
