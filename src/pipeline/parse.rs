//! Turning raw completions into output records.

use serde_json::Value;

use crate::error::OutputParseError;
use crate::export::OutputRecord;
use crate::utils::json_extraction::extract_json_object;

/// How strictly a completion must match the expected JSON object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// The whole completion must be a JSON object.
    #[default]
    Strict,
    /// Also accept an object wrapped in a code fence or surrounded by prose.
    Extract,
}

/// Parses a completion into an output record.
///
/// JSON that is valid but not an object is rejected in both modes.
pub fn parse_completion(raw: &str, mode: ParseMode) -> Result<OutputRecord, OutputParseError> {
    let strict = parse_object(raw);
    if mode == ParseMode::Strict {
        return strict;
    }
    match strict {
        Ok(record) => Ok(record),
        Err(err @ OutputParseError::NotAnObject { .. }) => Err(err),
        Err(err) => match extract_json_object(raw) {
            Some(candidate) => parse_object(&candidate).map_err(|_| err),
            None => Err(err),
        },
    }
}

fn parse_object(raw: &str) -> Result<OutputRecord, OutputParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OutputParseError::Empty);
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| OutputParseError::InvalidJson {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;

    match value {
        Value::Object(map) => Ok(OutputRecord::new(map)),
        other => Err(OutputParseError::NotAnObject {
            found: json_type_name(&other),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
