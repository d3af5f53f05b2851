// logcore - parsers/json.rs
//
// JSON and JSONL share one implementation: both parse one JSON object per
// logical line and apply the same alias-key mapping (spec section 6).
// Unrecognized scalars are copied as strings; objects/arrays are
// serialized back to JSON text for the field value.

use super::{LogRecord, LEVEL_KEYS, MESSAGE_KEYS, JSON_TIMESTAMP_KEYS};
use chrono::Utc;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, line: &str) -> LogRecord {
        let mut record = LogRecord::default();
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => {
                record.body = line.to_string();
                record.message = line.to_string();
                return record.apply_defaults();
            }
        };

        let Value::Object(map) = value else {
            record.body = line.to_string();
            record.message = line.to_string();
            return record.apply_defaults();
        };

        for (key, val) in map.iter() {
            let key_lower = key.to_lowercase();
            if JSON_TIMESTAMP_KEYS.contains(&key_lower.as_str()) && record.timestamp.is_none() {
                if let Some(s) = val.as_str() {
                    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                        record.timestamp = Some(dt.with_timezone(&Utc));
                    }
                }
                continue;
            }
            if LEVEL_KEYS.contains(&key_lower.as_str()) && record.level.is_empty() {
                record.level = stringify_scalar(val);
                record.severity = Some(record.level.clone());
                continue;
            }
            if MESSAGE_KEYS.contains(&key_lower.as_str()) && record.message.is_empty() {
                record.message = stringify_scalar(val);
                continue;
            }
            record.set_field(key.clone(), stringify_value(val));
        }

        if record.message.is_empty() {
            record.message = line.to_string();
        }
        record.body = record.message.clone();
        record.apply_defaults()
    }

    pub fn validate(&self, line: &str) -> bool {
        serde_json::from_str::<Value>(line).is_ok()
    }
}

fn stringify_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        object_or_array => object_or_array.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_alias_keys() {
        let p = JsonParser::new();
        let record = p.parse(r#"{"time":"2024-01-02T03:04:05Z","level":"warn","msg":"disk low"}"#);
        assert_eq!(record.level, "warn");
        assert_eq!(record.message, "disk low");
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn unrecognized_scalar_copied_as_string_field() {
        let p = JsonParser::new();
        let record = p.parse(r#"{"msg":"hi","user_id":42,"active":true}"#);
        assert_eq!(record.get_field("user_id"), "42");
        assert_eq!(record.get_field("active"), "true");
    }

    #[test]
    fn object_value_serialized_to_json_text() {
        let p = JsonParser::new();
        let record = p.parse(r#"{"msg":"hi","ctx":{"a":1}}"#);
        assert_eq!(record.get_field("ctx"), r#"{"a":1}"#);
    }

    #[test]
    fn invalid_json_falls_back_to_whole_line_as_body() {
        let p = JsonParser::new();
        let record = p.parse("not json at all");
        assert_eq!(record.body, "not json at all");
        assert_eq!(record.level, "INFO");
    }

    #[test]
    fn at_field_is_not_treated_as_timestamp_alias() {
        let p = JsonParser::new();
        let record = p.parse(r#"{"msg":"hi","at":"the office"}"#);
        assert_eq!(record.get_field("at"), "the office");
    }

    #[test]
    fn missing_message_falls_back_to_whole_line() {
        let p = JsonParser::new();
        let record = p.parse(r#"{"level":"info"}"#);
        assert_eq!(record.message, r#"{"level":"info"}"#);
    }
}
