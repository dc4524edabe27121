//! Record formatters: the truncating JSON formatter and the two text layouts.

use crate::error::ConfigError;
use crate::json::{self, JsonOptions};
use crate::message::render_message;
use crate::record::{format_span_id, format_trace_id, LogRecordView};
use crate::truncate::TruncationLimits;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use indexmap::IndexMap;
use otelwrap_core::{
    catch_quietly, float_to_json, panic_message, EncodedValue, EncoderOverrides, FieldSelector,
    StructuralEncoder, TypeEncoderRegistry, Value,
};
use std::fmt::Write as _;
use tracing::warn;

/// Anything that turns a record into one line of text.
pub trait RecordFormatter: Send + Sync {
    /// Format `record`. Must not fail.
    fn format(&self, record: &LogRecordView) -> String;
}

// ─── Time zone ────────────────────────────────────────────────────────────────

/// Name for a fixed offset: `UTC`, or `UTC+HH:MM` / `UTC-HH:MM`.
pub fn tz_name(offset: &FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    if secs == 0 {
        return "UTC".to_string();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.unsigned_abs();
    format!("UTC{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}

/// The machine's current UTC offset.
pub fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

fn validate_datefmt(datefmt: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(datefmt).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidDateFormat(datefmt.to_string()));
    }
    Ok(())
}

/// ISO-8601 with microseconds, the fraction omitted when it is zero.
fn iso_timestamp(local: &DateTime<FixedOffset>) -> String {
    if local.timestamp_subsec_micros() == 0 {
        local.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        local.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
    }
}

/// `created` in the formatter's zone, through `datefmt` when given.
fn render_time(created: &DateTime<Utc>, tz: &FixedOffset, datefmt: Option<&str>) -> String {
    let local = created.with_timezone(tz);
    match datefmt {
        Some(pattern) => {
            let mut out = String::new();
            match write!(out, "{}", local.format(pattern)) {
                Ok(()) => out,
                Err(_) => iso_timestamp(&local),
            }
        }
        None => iso_timestamp(&local),
    }
}

// ─── JSON formatter ───────────────────────────────────────────────────────────

/// Converts a record into one JSON object per line. Never fails.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    selector: FieldSelector,
    overrides: EncoderOverrides,
    registry: &'static TypeEncoderRegistry,
    datefmt: Option<String>,
    tz: FixedOffset,
    indent: Option<usize>,
    separators: Option<(String, String)>,
    truncation: TruncationLimits,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self {
            selector: FieldSelector::default(),
            overrides: EncoderOverrides::default(),
            registry: TypeEncoderRegistry::global(),
            datefmt: None,
            tz: local_offset(),
            indent: None,
            separators: None,
            truncation: TruncationLimits::default(),
        }
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> JsonFormatterBuilder {
        JsonFormatterBuilder::default()
    }

    pub fn selector(&self) -> &FieldSelector {
        &self.selector
    }

    pub fn time_zone(&self) -> FixedOffset {
        self.tz
    }

    /// Format with the configured selector.
    pub fn format(&self, record: &LogRecordView) -> String {
        self.format_with(record, &self.selector)
    }

    /// Format with an explicit selector.
    ///
    /// The selector picks and renames record attributes only; the values
    /// under them are encoded whole.
    pub fn format_with(&self, record: &LogRecordView, selector: &FieldSelector) -> String {
        let fields = self.collect_fields(record, selector);
        let values = FieldSelector::all().with_exclude_none(selector.exclude_none);

        let encoder = StructuralEncoder::new(self.registry);
        let source = Value::Map(
            fields
                .iter()
                .map(|(k, v)| (Value::from(k.as_str()), v.clone()))
                .collect(),
        );
        let mut encoded = match catch_quietly(|| encoder.encode(&source, &values, &self.overrides)) {
            Ok(encoded) => encoded,
            Err(payload) => {
                warn!(panic = %panic_message(payload.as_ref()), "encoder panicked, using per-field fallback");
                Self::safe_fields(&fields, selector.exclude_none)
            }
        };

        self.truncation.truncate_top_level(&mut encoded);

        let options = JsonOptions {
            ascii_only: selector.ascii_only,
            indent: self.indent,
            separators: self.separators.clone(),
            sort_keys: selector.sort_keys,
        };
        match json::to_string(&encoded, &options) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "JSON serialization failed");
                serde_json::json!({ "message": record.message.as_str() }).to_string()
            }
        }
    }

    /// Selected attributes keyed by output name: every attribute the
    /// exclude set lets through, or the explicit fields in their order.
    fn collect_fields(&self, record: &LogRecordView, selector: &FieldSelector) -> IndexMap<String, Value> {
        let mut attrs = record.attributes();
        attrs.insert("message".into(), Value::from(render_message(&record.message, &record.args)));
        attrs.insert(
            "asctime".into(),
            Value::from(render_time(&record.created, &self.tz, self.datefmt.as_deref())),
        );
        attrs.insert("tz_name".into(), Value::from(tz_name(&self.tz)));
        attrs.insert(
            "tz_utc_offset_seconds".into(),
            Value::from(self.tz.local_minus_utc()),
        );
        attrs.insert(
            "exc_text".into(),
            record.exc_info.as_ref().map(|info| info.render()).into(),
        );

        match selector.explicit_fields() {
            None => attrs
                .into_iter()
                .filter(|(key, _)| selector.output_key(key).is_some())
                .collect(),
            Some(explicit) => explicit
                .iter()
                .map(|(source, alias)| {
                    let value = attrs.get(source).cloned().unwrap_or(Value::Null);
                    (alias.clone(), value)
                })
                .collect(),
        }
    }

    /// Per-field degrade: primitives as-is, everything else as its repr.
    fn safe_fields(fields: &IndexMap<String, Value>, exclude_none: bool) -> EncodedValue {
        let mut out = serde_json::Map::new();
        for (key, value) in fields {
            if exclude_none && value.is_null() {
                continue;
            }
            let encoded = match value {
                Value::Null => EncodedValue::Null,
                Value::Bool(b) => EncodedValue::Bool(*b),
                Value::Int(i) => EncodedValue::from(*i),
                Value::UInt(u) => EncodedValue::from(*u),
                Value::Float(x) => float_to_json(*x),
                Value::Str(s) => EncodedValue::String(s.clone()),
                other => match catch_quietly(|| other.repr()) {
                    Ok(text) => EncodedValue::String(text),
                    Err(_) => continue,
                },
            };
            out.insert(key.clone(), encoded);
        }
        EncodedValue::Object(out)
    }
}

impl RecordFormatter for JsonFormatter {
    fn format(&self, record: &LogRecordView) -> String {
        JsonFormatter::format(self, record)
    }
}

/// Builder for [`JsonFormatter`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct JsonFormatterBuilder {
    selector: FieldSelector,
    overrides: EncoderOverrides,
    registry: Option<&'static TypeEncoderRegistry>,
    datefmt: Option<String>,
    tz: Option<FixedOffset>,
    indent: Option<usize>,
    separators: Option<(String, String)>,
    truncation: TruncationLimits,
}

impl JsonFormatterBuilder {
    /// Keep only these record attributes, under their own names.
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let flags = self.selector.clone();
        self.selector = FieldSelector::only(keys)
            .excluding(flags.exclude)
            .with_exclude_none(flags.exclude_none)
            .with_ascii_only(flags.ascii_only)
            .with_sort_keys(flags.sort_keys);
        self
    }

    /// Keep only these record attributes, renamed: source → output key.
    pub fn aliased_keys<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let flags = self.selector.clone();
        self.selector = FieldSelector::aliased(pairs)
            .excluding(flags.exclude)
            .with_exclude_none(flags.exclude_none)
            .with_ascii_only(flags.ascii_only)
            .with_sort_keys(flags.sort_keys);
        self
    }

    pub fn selector(mut self, selector: FieldSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn overrides(mut self, overrides: EncoderOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn registry(mut self, registry: &'static TypeEncoderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// chrono strftime pattern for `asctime`; ISO-8601 when unset.
    pub fn datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = Some(datefmt.into());
        self
    }

    pub fn time_zone(mut self, tz: FixedOffset) -> Self {
        self.tz = Some(tz);
        self
    }

    pub fn ascii_only(mut self, yes: bool) -> Self {
        self.selector.ascii_only = yes;
        self
    }

    pub fn sort_keys(mut self, yes: bool) -> Self {
        self.selector.sort_keys = yes;
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn separators(mut self, item: impl Into<String>, key: impl Into<String>) -> Self {
        self.separators = Some((item.into(), key.into()));
        self
    }

    pub fn truncation(mut self, limits: TruncationLimits) -> Self {
        self.truncation = limits;
        self
    }

    pub fn build(self) -> Result<JsonFormatter, ConfigError> {
        if let Some(datefmt) = &self.datefmt {
            validate_datefmt(datefmt)?;
        }
        Ok(JsonFormatter {
            selector: self.selector,
            overrides: self.overrides,
            registry: self.registry.unwrap_or_else(TypeEncoderRegistry::global),
            datefmt: self.datefmt,
            tz: self.tz.unwrap_or_else(local_offset),
            indent: self.indent,
            separators: self.separators,
            truncation: self.truncation,
        })
    }
}

// ─── Text formatter ───────────────────────────────────────────────────────────

/// Plain-text layouts carrying trace and span ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLayout {
    /// `asctime level [name] [file:func:line] [trace_id=.. span_id=.. resource.service.name=..] - message`
    Verbose,
    /// `level service [00-trace-span-01] [name:module:func] message`, the
    /// bracket being a W3C `traceparent` value.
    Minimal,
}

#[derive(Debug, Clone)]
pub struct TextFormatter {
    layout: TextLayout,
    tz: FixedOffset,
}

impl TextFormatter {
    pub fn new(layout: TextLayout) -> Self {
        Self {
            layout,
            tz: local_offset(),
        }
    }

    pub fn with_time_zone(mut self, tz: FixedOffset) -> Self {
        self.tz = tz;
        self
    }
}

impl RecordFormatter for TextFormatter {
    fn format(&self, record: &LogRecordView) -> String {
        let message = render_message(&record.message, &record.args);
        let mut line = match self.layout {
            TextLayout::Verbose => format!(
                "{} {:<8} [{}] [{}:{}:{}] [trace_id={} span_id={} resource.service.name={}] - {}",
                render_time(&record.created, &self.tz, None),
                record.level,
                record.name,
                record.filename(),
                record.func_name,
                record.lineno,
                format_trace_id(record.trace_id),
                format_span_id(record.span_id),
                record.service_name,
                message,
            ),
            TextLayout::Minimal => format!(
                "{:<8} {} [00-{:032x}-{:016x}-01] [{}:{}:{}] {}",
                record.level,
                record.service_name,
                record.trace_id,
                record.span_id,
                record.name,
                record.module,
                record.func_name,
                message,
            ),
        };
        if let Some(info) = &record.exc_info {
            line.push('\n');
            line.push_str(&info.render());
        }
        line
    }
}
