//! `tracing` events through the OpenTelemetry layer and `JsonLogLayer`.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use otelwrap_logging::{HandlerConfig, JsonHandler, JsonLogLayer, Level};
use serde_json::Value as Json;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;

fn capture<F: FnOnce()>(f: F) -> Vec<Json> {
    let buf = Arc::new(Mutex::new(Vec::<u8>::new()));
    let handler = Arc::new(JsonHandler::new(&HandlerConfig::stream(Level::Debug, buf.clone())).unwrap());
    let provider = TracerProvider::builder().build();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("tests")))
        .with(JsonLogLayer::new(handler, "layer-tests"));

    tracing::subscriber::with_default(subscriber, f);

    let text = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    text.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
}

#[test]
fn event_inside_span_carries_ids() {
    let lines = capture(|| {
        let span = tracing::info_span!("checkout");
        let _guard = span.enter();
        tracing::info!(order_id = 17u64, express = true, "order placed");
    });
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert_eq!(line["message"], "order placed");
    assert_eq!(line["funcName"], "checkout");
    assert_eq!(line["order_id"], 17);
    assert_eq!(line["express"], true);
    assert_eq!(line["otelServiceName"], "layer-tests");
    let trace_id = line["otelTraceID"].as_str().unwrap();
    let span_id = line["otelSpanID"].as_str().unwrap();
    assert_eq!(trace_id.len(), 34);
    assert_eq!(span_id.len(), 18);
    assert_ne!(trace_id, "0x00000000000000000000000000000000");
    assert_ne!(span_id, "0x0000000000000000");
}

#[test]
fn nested_spans_share_trace_id() {
    let lines = capture(|| {
        let outer = tracing::info_span!("outer");
        let _o = outer.enter();
        tracing::info!("in outer");
        let inner = tracing::info_span!("inner");
        let _i = inner.enter();
        tracing::info!("in inner");
    });
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["otelTraceID"], lines[1]["otelTraceID"]);
    assert_ne!(lines[0]["otelSpanID"], lines[1]["otelSpanID"]);
    assert_eq!(lines[1]["funcName"], "inner");
}

#[test]
fn event_outside_span_has_zero_ids() {
    let lines = capture(|| tracing::warn!(target: "billing", "no span here"));
    assert_eq!(lines[0]["otelTraceID"], "0x00000000000000000000000000000000");
    assert_eq!(lines[0]["otelSpanID"], "0x0000000000000000");
    assert_eq!(lines[0]["name"], "billing");
    assert_eq!(lines[0]["levelname"], "WARNING");
}

#[test]
fn handler_level_filters_events() {
    let lines = capture(|| {
        tracing::trace!("too quiet");
        tracing::debug!("kept");
    });
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["levelno"], 10);
}

#[test]
fn error_fields_become_exception_text() {
    let lines = capture(|| {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
        tracing::error!(error = &err as &(dyn std::error::Error + 'static), "startup failed");
    });
    assert_eq!(lines[0]["error"], "config.toml missing");
    assert_eq!(lines[0]["exc_text"], "Error: config.toml missing");
}
