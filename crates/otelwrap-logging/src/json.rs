//! JSON text output with configurable escaping, indentation, separators and
//! key order.
//!
//! Defaults mirror the conventional `json.dumps` layout: `", "` and `": "`
//! on one line, or `","` and `": "` when indenting.

use otelwrap_core::EncodedValue;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Map;
use std::io::{self, Write};

/// Serialization options for one formatter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonOptions {
    /// Escape every non-ASCII character as `\uXXXX`.
    pub ascii_only: bool,
    /// Spaces per nesting level; `None` keeps everything on one line.
    pub indent: Option<usize>,
    /// Item and key separators, overriding the defaults.
    pub separators: Option<(String, String)>,
    /// Sort object keys at every level.
    pub sort_keys: bool,
}

impl JsonOptions {
    fn resolved_separators(&self) -> (&str, &str) {
        match &self.separators {
            Some((item, key)) => (item.as_str(), key.as_str()),
            None if self.indent.is_some() => (",", ": "),
            None => (", ", ": "),
        }
    }
}

/// Serialize `value` to a string according to `options`.
pub fn to_string(value: &EncodedValue, options: &JsonOptions) -> io::Result<String> {
    let sorted;
    let value = if options.sort_keys {
        sorted = sort_keys(value);
        &sorted
    } else {
        value
    };

    let (item_sep, key_sep) = options.resolved_separators();
    let formatter = LayoutFormatter {
        item_sep: item_sep.as_bytes(),
        key_sep: key_sep.as_bytes(),
        indent: options.indent.map(|n| vec![b' '; n]),
        ascii_only: options.ascii_only,
        level: 0,
        has_value: false,
    };
    let mut buf = Vec::with_capacity(256);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).map_err(io::Error::from)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Copy of `value` with every object's keys in lexicographic order.
pub fn sort_keys(value: &EncodedValue) -> EncodedValue {
    match value {
        EncodedValue::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, EncodedValue> = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect();
            EncodedValue::Object(sorted)
        }
        EncodedValue::Array(items) => EncodedValue::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

// ─── Formatter ────────────────────────────────────────────────────────────────

struct LayoutFormatter<'a> {
    item_sep: &'a [u8],
    key_sep: &'a [u8],
    indent: Option<Vec<u8>>,
    ascii_only: bool,
    level: usize,
    has_value: bool,
}

impl LayoutFormatter<'_> {
    fn newline<W: ?Sized + Write>(&self, writer: &mut W) -> io::Result<()> {
        if let Some(indent) = &self.indent {
            writer.write_all(b"\n")?;
            for _ in 0..self.level {
                writer.write_all(indent)?;
            }
        }
        Ok(())
    }

    fn open<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        writer.write_all(bracket)
    }

    fn close<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.level -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(bracket)
    }

    fn item<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if !first {
            writer.write_all(self.item_sep)?;
        }
        self.newline(writer)
    }
}

impl Formatter for LayoutFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"[")
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.item(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"{")
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.item(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.key_sep)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        if !self.ascii_only || fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}
