//! Dynamic runtime values.
//!
//! Log events carry whatever the application hands them: scalars, nested
//! maps, records, enums, callables and opaque domain objects. `Value` is the
//! single representation the encoder walks; anything that is not one of the
//! structural variants travels as an [`Object`].

use crate::error::guarded;
use crate::object::Object;
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Placeholder used wherever even a diagnostic string cannot be produced.
pub const UNENCODABLE: &str = "<unencodable>";

// ─── Value ────────────────────────────────────────────────────────────────────

/// An arbitrary, untyped runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Raw byte sequence; encoded as decoded UTF-8 text.
    Bytes(Vec<u8>),
    Path(PathBuf),
    Enum(EnumMember),
    /// Plain named-field aggregate.
    Record(Record),
    /// Mapping with arbitrary keys, in insertion order.
    Map(Vec<(Value, Value)>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Unordered collection, kept in encounter order.
    Set(Vec<Value>),
    /// Lazily produced sequence.
    Iter(LazySeq),
    /// Function, method or pending task. Never invoked by the encoder.
    Callable(CodeRef),
    Object(Arc<dyn Object>),
}

/// Fieldless mirror of the [`Value`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    UInt,
    Float,
    Str,
    Bytes,
    Path,
    Enum,
    Record,
    Map,
    List,
    Tuple,
    Set,
    Iter,
    Callable,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::Path => "path",
            Self::Enum => "enum",
            Self::Record => "record",
            Self::Map => "map",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::Iter => "iterator",
            Self::Callable => "callable",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Exact-type identity used by the registry and by overrides.
///
/// Structural values are identified by their kind, opaque objects by the
/// `TypeId` of the concrete Rust type behind the `Arc<dyn Object>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Kind(ValueKind),
    Type(TypeId),
}

impl TypeKey {
    /// Key for a concrete Rust type wrapped in [`Value::Object`].
    pub fn of<T: Any>() -> Self {
        Self::Type(TypeId::of::<T>())
    }
}

impl Value {
    /// Wrap any [`Object`] implementor.
    pub fn object<T: Object>(obj: T) -> Self {
        Value::Object(Arc::new(obj))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    pub fn path(path: impl AsRef<Path>) -> Self {
        Value::Path(path.as_ref().to_path_buf())
    }

    /// Build a set from items in encounter order.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::Set(items.into_iter().map(Into::into).collect())
    }

    /// Build a mapping from key/value pairs in insertion order.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Path(_) => ValueKind::Path,
            Value::Enum(_) => ValueKind::Enum,
            Value::Record(_) => ValueKind::Record,
            Value::Map(_) => ValueKind::Map,
            Value::List(_) => ValueKind::List,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Set(_) => ValueKind::Set,
            Value::Iter(_) => ValueKind::Iter,
            Value::Callable(_) => ValueKind::Callable,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Exact-type identity of this value.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Value::Object(obj) => TypeKey::Type(obj.object_type_id()),
            other => TypeKey::Kind(other.kind()),
        }
    }

    /// Human-readable type name, used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Value::Object(obj) => obj.type_name().to_string(),
            Value::Record(r) => r.type_name.clone(),
            Value::Enum(m) => m.type_name.clone(),
            other => other.kind().to_string(),
        }
    }

    /// Borrow the concrete type behind a [`Value::Object`].
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Callable(_))
    }

    /// Returns `true` for the variants the encoder passes through unchanged.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Bool(_)
                | Value::Int(_)
                | Value::UInt(_)
                | Value::Float(_)
                | Value::Str(_)
        )
    }

    /// Debugging representation. Never fails: an object whose own `repr`
    /// errors or panics is shown as [`UNENCODABLE`].
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out);
        out
    }

    fn write_repr(&self, out: &mut String) {
        use std::fmt::Write as _;
        // Writing into a String cannot fail.
        let _ = match self {
            Value::Null => write!(out, "null"),
            Value::Bool(b) => write!(out, "{b}"),
            Value::Int(i) => write!(out, "{i}"),
            Value::UInt(u) => write!(out, "{u}"),
            Value::Float(x) => write!(out, "{x:?}"),
            Value::Str(s) => write!(out, "{s:?}"),
            Value::Bytes(b) => write!(out, "b\"{}\"", b.escape_ascii()),
            Value::Path(p) => write!(out, "Path({:?})", p.to_string_lossy()),
            Value::Enum(m) => write!(out, "{}.{}", m.type_name, m.variant),
            Value::Record(r) => {
                let _ = write!(out, "{} {{ ", r.type_name);
                for (i, (name, value)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(name);
                    out.push_str(": ");
                    value.write_repr(out);
                }
                write!(out, " }}")
            }
            Value::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.write_repr(out);
                    out.push_str(": ");
                    value.write_repr(out);
                }
                write!(out, "}}")
            }
            Value::List(items) => write_items(out, items, '[', ']'),
            Value::Tuple(items) => write_items(out, items, '(', ')'),
            Value::Set(items) => write_items(out, items, '{', '}'),
            Value::Iter(seq) => write!(out, "<iterator {}>", seq.name()),
            Value::Callable(code) => write!(out, "<{} {}>", code.kind, code.qualname),
            Value::Object(obj) => {
                let text = guarded("repr", || obj.repr()).unwrap_or_else(|_| UNENCODABLE.into());
                write!(out, "{text}")
            }
        };
    }
}

fn write_items(out: &mut String, items: &[Value], open: char, close: char) -> fmt::Result {
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write_repr(out);
    }
    out.push(close);
    Ok(())
}

/// The "string form" of a value, as used for message interpolation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::Callable(code) => f.write_str(&code.qualname),
            other => f.write_str(&other.repr()),
        }
    }
}

// ─── Structural helpers ───────────────────────────────────────────────────────

/// A member of an enumeration, carrying its underlying value.
#[derive(Debug, Clone)]
pub struct EnumMember {
    pub type_name: String,
    pub variant: String,
    pub value: Box<Value>,
}

impl EnumMember {
    pub fn new(
        type_name: impl Into<String>,
        variant: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            variant: variant.into(),
            value: Box::new(value.into()),
        }
    }
}

/// A plain named-field aggregate with no custom encoding logic.
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field append; declaration order is preserved.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

type SeqFactory = dyn Fn() -> Box<dyn Iterator<Item = Value>> + Send + Sync;

/// A re-iterable lazy sequence (generator factory).
///
/// Materializing it runs the factory again; the encoder never holds on to a
/// half-consumed iterator.
#[derive(Clone)]
pub struct LazySeq {
    name: String,
    factory: Arc<SeqFactory>,
}

impl LazySeq {
    pub fn new<F, I>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = Value> + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Iterator<Item = Value>>),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Eagerly collect every element.
    pub fn materialize(&self) -> Vec<Value> {
        (self.factory)().collect()
    }
}

impl fmt::Debug for LazySeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LazySeq").field(&self.name).finish()
    }
}

/// What kind of code a [`CodeRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Function,
    Method,
    /// A spawned or pending asynchronous computation.
    Task,
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => f.write_str("function"),
            Self::Method => f.write_str("method"),
            Self::Task => f.write_str("task"),
        }
    }
}

/// Reference to a callable or pending computation, by qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRef {
    pub kind: CodeKind,
    pub qualname: String,
}

impl CodeRef {
    pub fn new(kind: CodeKind, qualname: impl Into<String>) -> Self {
        Self {
            kind,
            qualname: qualname.into(),
        }
    }

    /// Describe a function item or closure by its Rust type path.
    pub fn of<F>(_f: &F) -> Self {
        Self::new(CodeKind::Function, std::any::type_name::<F>())
    }

    /// Describe a future (pending task) by its Rust type path.
    pub fn task_of<F: std::future::Future>(_f: &F) -> Self {
        Self::new(CodeKind::Task, std::any::type_name::<F>())
    }
}

// ─── Conversions ──────────────────────────────────────────────────────────────

macro_rules! impl_from_int {
    ($variant:ident, $cast:ty: $($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v as $cast)
            }
        })*
    };
}

impl_from_int!(Int, i64: i8, i16, i32, i64, isize);
impl_from_int!(UInt, u64: u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Value::Path(v)
    }
}

impl From<&Path> for Value {
    fn from(v: &Path) -> Self {
        Value::Path(v.to_path_buf())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Value {
    fn from((a, b): (A, B)) -> Self {
        Value::Tuple(vec![a.into(), b.into()])
    }
}

impl<K: Into<Value>, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(v: IndexMap<K, V>) -> Self {
        Value::map(v)
    }
}

impl From<EnumMember> for Value {
    fn from(v: EnumMember) -> Self {
        Value::Enum(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<LazySeq> for Value {
    fn from(v: LazySeq) -> Self {
        Value::Iter(v)
    }
}

impl From<CodeRef> for Value {
    fn from(v: CodeRef) -> Self {
        Value::Callable(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_of_nested_values() {
        let v = Value::map([
            (Value::from("a"), Value::from(vec![1i64, 2])),
            (Value::from(3i64), Value::bytes(b"\xffok".to_vec())),
        ]);
        assert_eq!(v.repr(), r#"{"a": [1, 2], 3: b"\xffok"}"#);
    }

    #[test]
    fn repr_of_record_and_enum() {
        let rec = Record::new("Point").field("x", 1i64).field("y", 2.5f64);
        assert_eq!(Value::from(rec).repr(), "Point { x: 1, y: 2.5 }");
        let red = EnumMember::new("Color", "RED", "red");
        assert_eq!(Value::from(red).repr(), "Color.RED");
    }

    #[test]
    fn display_uses_string_form() {
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(Value::from(1.5f64).to_string(), "1.5");
        assert_eq!(Value::from(None::<i64>).to_string(), "null");
    }

    #[test]
    fn json_numbers_keep_their_width() {
        let v = Value::from(serde_json::json!([-1, 18446744073709551615u64, 0.5]));
        match v {
            Value::List(items) => {
                assert!(matches!(items[0], Value::Int(-1)));
                assert!(matches!(items[1], Value::UInt(u64::MAX)));
                assert!(matches!(items[2], Value::Float(x) if x == 0.5));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn lazy_seq_is_reiterable() {
        let seq = LazySeq::new("squares", || (1..=3i64).map(|i| Value::Int(i * i)));
        assert_eq!(seq.materialize().len(), 3);
        assert_eq!(seq.materialize().len(), 3);
    }

    #[test]
    fn code_ref_uses_type_path() {
        fn sample() {}
        let code = CodeRef::of(&sample);
        assert_eq!(code.kind, CodeKind::Function);
        assert!(code.qualname.ends_with("sample"), "{}", code.qualname);
    }

    #[test]
    fn type_keys() {
        assert_eq!(Value::from(1i64).type_key(), TypeKey::Kind(ValueKind::Int));
        assert_eq!(Value::path("/tmp").kind(), ValueKind::Path);
    }
}
