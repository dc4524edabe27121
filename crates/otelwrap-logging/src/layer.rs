//! `tracing` bridge: turns events into [`LogRecordView`]s for a handler.
//!
//! Trace and span ids come from the OpenTelemetry data that
//! `tracing-opentelemetry` stores in the extensions of the event's span.
//! Events outside any span carry all-zero ids.

use crate::handler::JsonHandler;
use crate::record::{ExceptionInfo, Level, LogRecordView};
use opentelemetry::trace::{SpanId, TraceContextExt, TraceId};
use otelwrap_core::Value;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_opentelemetry::OtelData;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Layer forwarding every event to a [`JsonHandler`].
#[derive(Debug, Clone)]
pub struct JsonLogLayer {
    handler: Arc<JsonHandler>,
    service_name: String,
}

impl JsonLogLayer {
    pub fn new(handler: Arc<JsonHandler>, service_name: impl Into<String>) -> Self {
        Self {
            handler,
            service_name: service_name.into(),
        }
    }

    pub fn handler(&self) -> &Arc<JsonHandler> {
        &self.handler
    }
}

impl<S> Layer<S> for JsonLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from_tracing(meta.level());
        if !self.handler.enabled(level) {
            return;
        }

        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        let (func_name, trace_id, span_id) = match ctx.event_span(event) {
            Some(span) => {
                let (trace_id, span_id) = span
                    .extensions()
                    .get::<OtelData>()
                    .map(otel_ids)
                    .unwrap_or((0, 0));
                (span.name().to_string(), trace_id, span_id)
            }
            None => (String::new(), 0, 0),
        };

        let mut record = LogRecordView::new(level, meta.target(), visitor.message.unwrap_or_default())
            .with_location(
                meta.file().unwrap_or_default(),
                meta.module_path().unwrap_or_default(),
                func_name,
                meta.line().unwrap_or_default(),
            )
            .with_trace(trace_id, span_id)
            .with_service_name(self.service_name.as_str());
        record.exc_info = visitor.exception;
        record.extra = visitor.fields;

        self.handler.handle(&record);
    }
}

/// Trace and span id of a span's OpenTelemetry data, as integers.
fn otel_ids(data: &OtelData) -> (u128, u64) {
    let trace_id = data
        .builder
        .trace_id
        .unwrap_or_else(|| data.parent_cx.span().span_context().trace_id());
    let span_id = data.builder.span_id.unwrap_or(SpanId::INVALID);
    (trace_id_number(trace_id), span_id_number(span_id))
}

fn trace_id_number(id: TraceId) -> u128 {
    u128::from_be_bytes(id.to_bytes())
}

fn span_id_number(id: SpanId) -> u64 {
    u64::from_be_bytes(id.to_bytes())
}

// ─── Field visitor ────────────────────────────────────────────────────────────

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    exception: Option<ExceptionInfo>,
    fields: Vec<(String, Value)>,
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldCollector {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::Float(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::UInt(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn StdError + 'static)) {
        if self.exception.is_none() {
            self.exception = Some(ExceptionInfo::from_dyn(value));
        }
        self.push(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, Value::from(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_numbers_are_big_endian() {
        let trace = TraceId::from_hex("0000000000000000000000000000beef").unwrap();
        let span = SpanId::from_hex("000000000000beef").unwrap();
        assert_eq!(trace_id_number(trace), 48879);
        assert_eq!(span_id_number(span), 48879);
        assert_eq!(trace_id_number(TraceId::INVALID), 0);
    }
}
