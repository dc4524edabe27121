//! Handler destinations and the handler cache.

use otelwrap_logging::{
    get_json_handler, shared_stream, ConfigError, HandlerConfig, JsonFormatter, JsonHandler, Level,
    LogRecordView,
};
use std::io::Write;
use std::sync::{Arc, Mutex};

#[test]
fn file_handler_appends_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(b"existing\n")
        .unwrap();

    let handler = get_json_handler(&HandlerConfig::file(Level::Info, &path)).unwrap();
    handler.handle(&LogRecordView::new(Level::Info, "svc", "first"));
    handler.handle(&LogRecordView::new(Level::Debug, "svc", "filtered"));
    handler.handle(&LogRecordView::new(Level::Error, "svc", "second"));

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "existing");
    let first: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    let second: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
    assert_eq!(first["message"], "first");
    assert_eq!(second["levelname"], "ERROR");
}

#[test]
fn same_destination_and_level_share_a_handler() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.log");

    let a = get_json_handler(&HandlerConfig::file(Level::Info, &path)).unwrap();
    let b = get_json_handler(&HandlerConfig::file(Level::Info, &path)).unwrap();
    let c = get_json_handler(&HandlerConfig::file(Level::Warning, &path)).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn streams_are_identified_by_instance() {
    let one = shared_stream(Vec::<u8>::new());
    let two = shared_stream(Vec::<u8>::new());

    let a = get_json_handler(&HandlerConfig::stream(Level::NotSet, one.clone())).unwrap();
    let b = get_json_handler(&HandlerConfig::stream(Level::NotSet, one)).unwrap();
    let c = get_json_handler(&HandlerConfig::stream(Level::NotSet, two)).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn unopenable_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("app.log");
    let err = get_json_handler(&HandlerConfig::file(Level::Info, path)).unwrap_err();
    assert!(matches!(err, ConfigError::OpenFile { .. }));
}

#[test]
fn custom_formatter_on_stream() {
    let buf = Arc::new(Mutex::new(Vec::<u8>::new()));
    let formatter = JsonFormatter::builder()
        .keys(["levelname", "message"])
        .build()
        .unwrap();
    let handler = JsonHandler::new(&HandlerConfig::stream(Level::NotSet, buf.clone()))
        .unwrap()
        .with_formatter(formatter);

    handler.handle(&LogRecordView::new(Level::Warning, "svc", "disk at {}%").with_args([91i64]));

    let text = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    assert_eq!(text, "{\"levelname\": \"WARNING\", \"message\": \"disk at 91%\"}\n");
}
