//! Last-resort degrade path for values no other rule recognised.
//!
//! Each step is an isolated attempt: a failing or panicking probe is logged
//! at debug level and the next step runs. The final step cannot fail.

use crate::error::{guarded, EncodeError};
use crate::object::Capabilities;
use crate::value::{Value, UNENCODABLE};
use tracing::debug;

/// What the fallback chain managed to extract from a value.
#[derive(Debug, Clone)]
pub enum Degraded {
    /// The value coerced to key/value pairs; encode them as a mapping.
    Entries(Vec<(Value, Value)>),
    /// Public attributes with callables removed; encode them as a mapping.
    Attributes(Vec<(String, Value)>),
    /// Diagnostic text, never empty.
    Text(String),
}

/// Ordered attempts: mapping coercion, attribute harvesting, diagnostic text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackChain;

impl FallbackChain {
    pub fn degrade(&self, value: &Value) -> Degraded {
        let caps = Capabilities::of(value);

        if caps.contains(Capabilities::MAPPING) {
            match Self::entries(value) {
                Ok(entries) => return Degraded::Entries(entries),
                Err(e) => debug!(type_name = %value.type_name(), error = %e, "mapping coercion failed"),
            }
        }

        if caps.contains(Capabilities::ATTRIBUTES) {
            match Self::attributes(value) {
                Ok(attrs) => return Degraded::Attributes(attrs),
                Err(e) => debug!(type_name = %value.type_name(), error = %e, "attribute harvest failed"),
            }
        }

        Degraded::Text(Self::diagnostic(value))
    }

    fn entries(value: &Value) -> Result<Vec<(Value, Value)>, EncodeError> {
        match value {
            Value::Map(entries) => Ok(entries.clone()),
            Value::Object(obj) => guarded("entries", || obj.entries()),
            other => Err(EncodeError::unsupported(other.type_name(), "entries")),
        }
    }

    fn attributes(value: &Value) -> Result<Vec<(String, Value)>, EncodeError> {
        match value {
            Value::Object(obj) => {
                let attrs = guarded("attributes", || obj.attributes())?;
                Ok(attrs.into_iter().filter(|(_, v)| !v.is_callable()).collect())
            }
            other => Err(EncodeError::unsupported(other.type_name(), "attributes")),
        }
    }

    fn diagnostic(value: &Value) -> String {
        let text = value.repr();
        if text.is_empty() {
            UNENCODABLE.to_string()
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use crate::value::CodeRef;

    struct Broken;

    impl Object for Broken {
        fn type_name(&self) -> &str {
            "Broken"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::MAPPING | Capabilities::ATTRIBUTES
        }

        fn entries(&self) -> Result<Vec<(Value, Value)>, EncodeError> {
            panic!("entries exploded")
        }

        fn attributes(&self) -> Result<Vec<(String, Value)>, EncodeError> {
            Err(EncodeError::Other("no attributes".into()))
        }

        fn repr(&self) -> Result<String, EncodeError> {
            panic!("repr exploded")
        }
    }

    struct Settings;

    impl Object for Settings {
        fn capabilities(&self) -> Capabilities {
            Capabilities::MAPPING | Capabilities::ATTRIBUTES
        }

        fn entries(&self) -> Result<Vec<(Value, Value)>, EncodeError> {
            Err(EncodeError::Other("not a mapping".into()))
        }

        fn attributes(&self) -> Result<Vec<(String, Value)>, EncodeError> {
            Ok(vec![
                ("host".into(), Value::from("localhost")),
                ("reload".into(), Value::from(CodeRef::of(&Settings::reload))),
            ])
        }
    }

    impl Settings {
        fn reload() {}
    }

    #[test]
    fn every_step_failing_still_yields_text() {
        match FallbackChain.degrade(&Value::object(Broken)) {
            Degraded::Text(text) => assert_eq!(text, UNENCODABLE),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn failed_mapping_falls_through_to_attributes() {
        match FallbackChain.degrade(&Value::object(Settings)) {
            Degraded::Attributes(attrs) => {
                assert_eq!(attrs.len(), 1);
                assert_eq!(attrs[0].0, "host");
            }
            other => panic!("expected attributes, got {other:?}"),
        }
    }

    #[test]
    fn plain_values_use_repr() {
        match FallbackChain.degrade(&Value::bytes(vec![0xff])) {
            Degraded::Text(text) => assert_eq!(text, r#"b"\xff""#),
            other => panic!("expected text, got {other:?}"),
        }
    }
}
