//! Formatter scenarios: every record must come out as parseable JSON.

use chrono::{NaiveDate, TimeZone, Utc};
use otelwrap_core::{Capabilities, EncodeError, Object, Value};
use otelwrap_logging::{
    format_trace_id, JsonFormatter, Level, LogRecordView, TruncationLimits, TRUNCATION_MARKER,
};
use proptest::prelude::*;
use serde_json::{json, Value as Json};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn record(message: &str) -> LogRecordView {
    LogRecordView::new(Level::Info, "tests", message)
        .with_created(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
}

fn format(record: &LogRecordView) -> Json {
    let line = JsonFormatter::new().format(record);
    serde_json::from_str(&line).unwrap_or_else(|e| panic!("not JSON ({e}): {line}"))
}

/// Object that only exposes attributes.
struct Session {
    id: u32,
}

impl Object for Session {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ATTRIBUTES
    }

    fn attributes(&self) -> Result<Vec<(String, Value)>, EncodeError> {
        Ok(vec![("id".into(), Value::from(self.id))])
    }
}

/// Object whose every probe panics.
struct Cursed;

impl Object for Cursed {
    fn capabilities(&self) -> Capabilities {
        Capabilities::MAPPING | Capabilities::ATTRIBUTES | Capabilities::NAMED_FIELDS
    }

    fn fields(&self) -> Result<Vec<(String, Value)>, EncodeError> {
        panic!("fields")
    }

    fn entries(&self) -> Result<Vec<(Value, Value)>, EncodeError> {
        panic!("entries")
    }

    fn attributes(&self) -> Result<Vec<(String, Value)>, EncodeError> {
        panic!("attributes")
    }

    fn repr(&self) -> Result<String, EncodeError> {
        panic!("repr")
    }
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn trace_id_is_rendered_as_padded_hex() {
    let out = format(&record("traced").with_trace(48879, 1));
    assert_eq!(out["otelTraceID"], json!("0x0000000000000000000000000000beef"));
    assert_eq!(out["otelSpanID"], json!("0x0000000000000001"));
    assert_eq!(format_trace_id(48879), "0x0000000000000000000000000000beef");
}

#[test]
fn bad_interpolation_still_formats() {
    let out = format(&record("{} then {}").with_args([1i64]));
    assert_eq!(out["message"], json!("MSG=\"{} then {}\" ARGS=(1)"));
}

#[test]
fn huge_attribute_is_truncated() {
    let original: String = (0..20_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let out = format(&record("big").with_extra("payload", original.as_str()));
    let payload = out["payload"].as_str().unwrap();
    assert_eq!(payload.chars().count(), 9_985 + TRUNCATION_MARKER.len());
    assert_eq!(&payload[..9_985], &original[..9_985]);
    assert!(payload.ends_with("... (truncated)"));
}

#[test]
fn sets_keep_duplicates() {
    let out = format(&record("tags").with_extra("tags", Value::set([1i64, 1, 2])));
    assert_eq!(out["tags"], json!([1, 1, 2]));
}

#[test]
fn selected_key_keeps_nested_map() {
    let formatter = JsonFormatter::builder().keys(["message", "user"]).build().unwrap();
    let line = formatter.format(
        &record("login").with_extra("user", Value::map([("id", Value::from(7i64)), ("role", Value::from("admin"))])),
    );
    assert_eq!(line, r#"{"message": "login", "user": {"id": 7, "role": "admin"}}"#);
}

#[test]
fn huge_message_is_truncated() {
    let out = format(&record(&"m".repeat(12_000)));
    assert!(out["message"].as_str().unwrap().ends_with(TRUNCATION_MARKER));
    assert!(out["msg"].as_str().unwrap().ends_with(TRUNCATION_MARKER));
}

#[test]
fn custom_truncation_limits() {
    let formatter = JsonFormatter::builder()
        .truncation(TruncationLimits { max_chars: 5, keep_chars: 2 })
        .keys(["message"])
        .build()
        .unwrap();
    assert_eq!(
        formatter.format(&record("abcdefgh")),
        format!(r#"{{"message": "ab{TRUNCATION_MARKER}"}}"#)
    );
}

#[test]
fn attribute_only_object_in_extras() {
    let out = format(&record("login").with_extra("session", Value::object(Session { id: 9 })));
    assert_eq!(out["session"], json!({"id": 9}));
}

#[test]
fn cursed_object_yields_diagnostic() {
    let out = format(&record("cursed").with_extra("thing", Value::object(Cursed)));
    assert_eq!(out["thing"], json!("<unencodable>"));
    assert_eq!(out["message"], json!("cursed"));
}

#[test]
fn extras_use_the_type_registry() {
    let out = format(
        &record("dated")
            .with_extra("day", Value::object(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
            .with_extra("ids", Value::map([(1i64, "a"), (2i64, "b")])),
    );
    assert_eq!(out["day"], json!("2024-01-01"));
    assert_eq!(out["ids"], json!({"1": "a", "2": "b"}));
}

#[test]
fn ascii_only_output() {
    let formatter = JsonFormatter::builder()
        .keys(["message"])
        .ascii_only(true)
        .build()
        .unwrap();
    assert_eq!(formatter.format(&record("café")), r#"{"message": "caf\u00e9"}"#);
}

proptest! {
    #[test]
    fn any_message_and_args_produce_json(
        template in ".{0,64}",
        args in prop::collection::vec(any::<i64>(), 0..4),
    ) {
        let line = JsonFormatter::new().format(&record(&template).with_args(args));
        let parsed: Json = serde_json::from_str(&line).unwrap();
        prop_assert!(parsed["message"].is_string());
    }
}
