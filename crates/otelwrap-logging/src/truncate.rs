//! Truncation of oversized top-level strings.

use otelwrap_core::EncodedValue;
use serde::{Deserialize, Serialize};

pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Strings longer than `max_chars` keep their first `keep_chars` characters
/// followed by [`TRUNCATION_MARKER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationLimits {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_keep_chars")]
    pub keep_chars: usize,
}

fn default_max_chars() -> usize {
    10_000
}

fn default_keep_chars() -> usize {
    9_985
}

impl Default for TruncationLimits {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            keep_chars: default_keep_chars(),
        }
    }
}

impl TruncationLimits {
    /// Truncated copy of `s`, or `None` if it is within the limit.
    pub fn apply(&self, s: &str) -> Option<String> {
        // Fast path: byte length bounds char count from above.
        if s.len() <= self.max_chars || s.chars().count() <= self.max_chars {
            return None;
        }
        let mut out: String = s.chars().take(self.keep_chars).collect();
        out.push_str(TRUNCATION_MARKER);
        Some(out)
    }

    /// Truncate every string directly under a top-level object.
    ///
    /// Nested strings and non-object roots are left alone.
    pub fn truncate_top_level(&self, value: &mut EncodedValue) {
        let EncodedValue::Object(map) = value else {
            return;
        };
        for (_, v) in map.iter_mut() {
            if let EncodedValue::String(s) = v {
                if let Some(short) = self.apply(s) {
                    *s = short;
                }
            }
        }
    }
}
