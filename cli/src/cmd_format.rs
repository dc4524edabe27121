//! `otelwrap format`: turn a JSON event read from stdin into one log line.
//!
//! Recognised keys: `message` (or `msg`), `level`, `name`, `args`,
//! `created`, `trace_id`, `span_id`, `service_name`, `exception`. Every
//! other key is attached to the record as an extra attribute.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use otelwrap_core::Value;
use otelwrap_logging::{ExceptionInfo, JsonFormatter, Level, LogRecordView};
use serde_json::{Map, Value as Json};
use std::io::Read;

pub struct FormatOptions {
    pub keys: Vec<String>,
    pub ascii: bool,
    pub sort_keys: bool,
    pub indent: Option<usize>,
    pub datefmt: Option<String>,
}

pub fn run(opts: &FormatOptions) -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("reading event from stdin")?;
    let line = format_event(&input, opts)?;
    println!("{line}");
    Ok(())
}

pub fn format_event(input: &str, opts: &FormatOptions) -> Result<String> {
    let event: Json = serde_json::from_str(input).context("stdin is not valid JSON")?;
    let fields = match event {
        Json::Object(fields) => fields,
        other => bail!("expected a JSON object, got {}", kind_of(&other)),
    };
    let record = record_from_fields(fields)?;

    let mut builder = JsonFormatter::builder()
        .ascii_only(opts.ascii)
        .sort_keys(opts.sort_keys);
    if !opts.keys.is_empty() {
        builder = builder.keys(opts.keys.iter().map(String::as_str));
    }
    if let Some(indent) = opts.indent {
        builder = builder.indent(indent);
    }
    if let Some(datefmt) = &opts.datefmt {
        builder = builder.datefmt(datefmt.as_str());
    }
    Ok(builder.build()?.format(&record))
}

fn record_from_fields(mut fields: Map<String, Json>) -> Result<LogRecordView> {
    let message = take_string(&mut fields, "message")
        .or_else(|| take_string(&mut fields, "msg"))
        .unwrap_or_default();
    let level = match fields.shift_remove("level") {
        None => Level::Info,
        Some(Json::String(s)) => s.parse()?,
        Some(Json::Number(n)) => n.to_string().parse()?,
        Some(other) => bail!("level must be a name or number, got {}", kind_of(&other)),
    };
    let name = take_string(&mut fields, "name").unwrap_or_else(|| "otelwrap".into());

    let mut record = LogRecordView::new(level, name, message);

    if let Some(args) = fields.shift_remove("args") {
        let Json::Array(args) = args else {
            bail!("args must be an array");
        };
        record = record.with_args(args.into_iter().map(Value::from));
    }
    if let Some(created) = take_string(&mut fields, "created") {
        let created = DateTime::parse_from_rfc3339(&created)
            .with_context(|| format!("created is not RFC 3339: {created}"))?;
        record = record.with_created(created.with_timezone(&Utc));
    }

    let trace_id = fields.shift_remove("trace_id").map(|v| parse_id(&v)).transpose()?;
    let span_id = fields.shift_remove("span_id").map(|v| parse_id(&v)).transpose()?;
    if trace_id.is_some() || span_id.is_some() {
        let span_id = u64::try_from(span_id.unwrap_or(0)).context("span_id exceeds 64 bits")?;
        record = record.with_trace(trace_id.unwrap_or(0), span_id);
    }
    if let Some(service) = take_string(&mut fields, "service_name") {
        record = record.with_service_name(service);
    }
    if let Some(exception) = take_string(&mut fields, "exception") {
        record = record.with_exception(ExceptionInfo::new("Error", exception));
    }

    for (key, value) in fields {
        record = record.with_extra(key, Value::from(value));
    }
    Ok(record)
}

fn take_string(fields: &mut Map<String, Json>, key: &str) -> Option<String> {
    match fields.shift_remove(key)? {
        Json::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Ids come as integers or `0x`-prefixed hex strings.
fn parse_id(value: &Json) -> Result<u128> {
    match value {
        Json::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| anyhow!("id must be a non-negative integer: {n}")),
        Json::String(s) => {
            let digits = s.strip_prefix("0x").unwrap_or(s);
            u128::from_str_radix(digits, 16).with_context(|| format!("invalid hex id: {s}"))
        }
        other => bail!("id must be a number or hex string, got {}", kind_of(other)),
    }
}

fn kind_of(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
