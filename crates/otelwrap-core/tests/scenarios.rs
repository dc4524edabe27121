//! End-to-end encoding scenarios.
//!
//! Each test builds a value the way an application would hand it to a
//! logger and checks the JSON that comes out of the global registry.

use chrono::NaiveDate;
use otelwrap_core::{
    encode, jsonable, Capabilities, CodeRef, EncodeError, EncoderOverrides, EnumMember,
    FieldSelector, Object, Record, TypeEncoderRegistry, StructuralEncoder, Value, ValueKind,
    UNENCODABLE,
};
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use std::net::Ipv4Addr;

// ─── Fixtures ─────────────────────────────────────────────────────────────────

/// Object exposing only public attributes.
struct Connection {
    host: String,
    port: u16,
}

impl Object for Connection {
    fn type_name(&self) -> &str {
        "db::Connection"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ATTRIBUTES
    }

    fn attributes(&self) -> Result<Vec<(String, Value)>, EncodeError> {
        Ok(vec![
            ("host".into(), Value::from(self.host.as_str())),
            ("port".into(), Value::from(self.port)),
            ("close".into(), Value::from(CodeRef::of(&Connection::close))),
        ])
    }
}

impl Connection {
    fn close() {}
}

/// Object whose every probe misbehaves.
struct Hostile;

impl Object for Hostile {
    fn capabilities(&self) -> Capabilities {
        Capabilities::MAPPING | Capabilities::ATTRIBUTES | Capabilities::SEQUENCE
    }

    fn entries(&self) -> Result<Vec<(Value, Value)>, EncodeError> {
        panic!("entries")
    }

    fn elements(&self) -> Result<Vec<Value>, EncodeError> {
        Err(EncodeError::Other("elements".into()))
    }

    fn attributes(&self) -> Result<Vec<(String, Value)>, EncodeError> {
        panic!("attributes")
    }

    fn repr(&self) -> Result<String, EncodeError> {
        Err(EncodeError::Other("repr".into()))
    }
}

/// Mapping-like object that is not a `Value::Map`.
struct Headers(Vec<(&'static str, &'static str)>);

impl Object for Headers {
    fn capabilities(&self) -> Capabilities {
        Capabilities::MAPPING
    }

    fn entries(&self) -> Result<Vec<(Value, Value)>, EncodeError> {
        Ok(self
            .0
            .iter()
            .map(|(k, v)| (Value::from(*k), Value::from(*v)))
            .collect())
    }
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn date_renders_as_iso_string() {
    let date = Value::object(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(jsonable(&date), json!("2024-01-01"));
}

#[test]
fn date_inside_event_payload() {
    let payload = Value::map([
        ("when", Value::object(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
        ("peer", Value::object(Ipv4Addr::new(127, 0, 0, 1))),
        ("id", Value::object(uuid::Uuid::nil())),
    ]);
    assert_eq!(
        jsonable(&payload),
        json!({
            "when": "2024-01-01",
            "peer": "127.0.0.1",
            "id": "00000000-0000-0000-0000-000000000000",
        })
    );
}

#[test]
fn integer_keys_are_stringified() {
    let v = Value::map([(1i64, "a"), (2i64, "b")]);
    assert_eq!(jsonable(&v), json!({"1": "a", "2": "b"}));
}

#[test]
fn enum_key_and_value() {
    let red = Value::from(EnumMember::new("Color", "RED", "red"));
    assert_eq!(jsonable(&red), json!("red"));
    let v = Value::Map(vec![(red.clone(), red)]);
    assert_eq!(jsonable(&v), json!({"red": "red"}));
}

#[test]
fn attribute_only_object_is_harvested() {
    let conn = Value::object(Connection {
        host: "db.local".into(),
        port: 5432,
    });
    assert_eq!(jsonable(&conn), json!({"host": "db.local", "port": 5432}));
}

#[test]
fn hostile_object_yields_diagnostic() {
    let out = jsonable(&Value::object(Hostile));
    assert_eq!(out, json!(UNENCODABLE));
}

#[test]
fn mapping_object_is_coerced() {
    let headers = Value::object(Headers(vec![("accept", "*/*"), ("host", "example.org")]));
    assert_eq!(
        jsonable(&headers),
        json!({"accept": "*/*", "host": "example.org"})
    );
}

#[test]
fn sets_become_lists() {
    let ordered: BTreeSet<i64> = [3, 1, 2].into_iter().collect();
    assert_eq!(jsonable(&Value::object(ordered)), json!([1, 2, 3]));

    let unordered: HashSet<&'static str> = ["only"].into_iter().collect();
    assert_eq!(jsonable(&Value::object(unordered)), json!(["only"]));

    assert_eq!(jsonable(&Value::set(["b", "a"])), json!(["b", "a"]));
}

#[test]
fn path_values_render_as_strings() {
    assert_eq!(jsonable(&Value::path("/var/log/app.log")), json!("/var/log/app.log"));
    let buf = std::path::PathBuf::from("relative/file.txt");
    assert_eq!(jsonable(&Value::object(buf)), json!("relative/file.txt"));
}

#[test]
fn nested_records_with_aliases() {
    let user = Record::new("User")
        .field("user_id", 7i64)
        .field("password", "hunter2")
        .field("email", Value::Null);
    let event = Value::map([("user_id", Value::from(user)), ("noise", Value::from(1i64))]);
    let selector = FieldSelector::aliased([("user_id", "uid")]).excluding(["password"]);
    assert_eq!(
        encode(&event, &selector, &EncoderOverrides::default()),
        json!({"uid": {"uid": 7}})
    );
}

#[test]
fn override_wins_over_builtin_encoder() {
    let overrides = EncoderOverrides::new()
        .with_type::<NaiveDate, _>(|d| Ok(json!(d.format("%d/%m/%Y").to_string())));
    let date = Value::object(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    assert_eq!(
        encode(&date, &FieldSelector::default(), &overrides),
        json!("31/01/2024")
    );
}

#[test]
fn failing_override_falls_through() {
    let overrides =
        EncoderOverrides::new().with_kind(ValueKind::Str, |_| Err(EncodeError::Other("no".into())));
    assert_eq!(
        encode(&Value::from("kept"), &FieldSelector::default(), &overrides),
        json!("kept")
    );
}

#[test]
fn custom_registry_extends_without_touching_encoder() {
    struct Money {
        cents: i64,
    }
    impl Object for Money {}

    let mut registry = TypeEncoderRegistry::with_builtins();
    registry.register_type::<Money, _>(|m| {
        Ok(Value::map([
            ("amount", Value::object(rust_decimal::Decimal::new(m.cents, 2))),
            ("currency", Value::from("EUR")),
        ]))
    });
    let out = StructuralEncoder::new(&registry).encode(
        &Value::object(Money { cents: 1250 }),
        &FieldSelector::default(),
        &EncoderOverrides::default(),
    );
    assert_eq!(out, json!({"amount": 12.5, "currency": "EUR"}));
}

#[test]
fn unregistered_object_uses_repr() {
    struct Opaque;
    impl Object for Opaque {
        fn type_name(&self) -> &str {
            "Opaque"
        }
    }
    assert_eq!(jsonable(&Value::object(Opaque)), json!("<Opaque object>"));
}

#[test]
fn pending_task_is_named() {
    let task = async { 1 };
    let code = CodeRef::task_of(&task);
    let out = jsonable(&Value::from(code));
    assert!(out.as_str().unwrap().contains("pending_task_is_named"), "{out}");
}
