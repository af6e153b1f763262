//! Service broker metadata
//!
//! Brokers describe themselves with an opaque JSON string. Only the
//! `shareable` capability matters here, and only a literal `true` enables
//! it. A string that is not a JSON object is a parse failure, which callers
//! must keep distinct from "not shareable".

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Broker metadata parse errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Typed view of the broker metadata fields Cirrus reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerMetadata {
    pub shareable: bool,
}

impl BrokerMetadata {
    /// Parse a raw metadata string. An empty string declares nothing.
    pub fn parse(raw: &str) -> Result<Self, MetadataError> {
        if raw.trim().is_empty() {
            return Ok(Self { shareable: false });
        }

        let value: Value = serde_json::from_str(raw)?;
        let object = value.as_object().ok_or_else(|| {
            MetadataError::NotAnObject(match &value {
                Value::Null => "null",
                Value::Bool(_) => "a boolean",
                Value::Number(_) => "a number",
                Value::String(_) => "a string",
                Value::Array(_) => "an array",
                Value::Object(_) => "an object",
            })
        })?;

        Ok(Self {
            shareable: matches!(object.get("shareable"), Some(Value::Bool(true))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shareable_true() {
        let metadata = BrokerMetadata::parse(r#"{"shareable": true, "other": 1}"#).unwrap();
        assert!(metadata.shareable);
    }

    #[test]
    fn test_shareable_must_be_literal_true() {
        assert!(!BrokerMetadata::parse(r#"{"shareable": "true"}"#).unwrap().shareable);
        assert!(!BrokerMetadata::parse(r#"{"shareable": false}"#).unwrap().shareable);
        assert!(!BrokerMetadata::parse(r#"{}"#).unwrap().shareable);
        assert!(!BrokerMetadata::parse("").unwrap().shareable);
    }

    #[test]
    fn test_parse_failures_are_distinct() {
        assert!(matches!(
            BrokerMetadata::parse("{not json"),
            Err(MetadataError::Malformed(_))
        ));
        assert!(matches!(
            BrokerMetadata::parse("[true]"),
            Err(MetadataError::NotAnObject("an array"))
        ));
    }
}
