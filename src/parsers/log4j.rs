// logcore - parsers/log4j.rs
//
// Grounded on `original_source/src/log4j_parser.cpp`'s `Log4jParser`:
// optional `yyyy-MM-dd HH:mm:ss[,SSS]` timestamp, a required level word,
// an optional `[thread]`, an optional `logger:` prefix, then the rest of
// the line as the message. Key=value pairs embedded in the message
// (`foo=bar`, `foo="bar baz"`) are lifted into fields and trimmed out of
// the message up to the first `{`, matching the source's trailing
// structured-data convention; `thread`/`logger` keys never overwrite the
// fields already captured from the header.

use super::LogRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:(\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}(?:,\d{3})?)\s+)?",
            r"(\w+)\s+",
            r"(?:\[([^\]]+)\]\s+)?",
            r"(?:([^\s:]+):\s+)?",
            r"(.*)$",
        ))
        .unwrap()
    })
}

fn kv_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)=(?:([^"\s][^\s]*)|"([^"]*)")"#).unwrap())
}

#[derive(Debug, Clone, Default)]
pub struct Log4jParser;

impl Log4jParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, line: &str) -> LogRecord {
        let mut record = LogRecord::default();

        if let Some(caps) = pattern().captures(line) {
            if let Some(ts) = caps.get(1) {
                record.timestamp = parse_log4j_timestamp(ts.as_str());
            }
            record.level = caps[2].to_string();
            record.severity = Some(record.level.clone());
            if let Some(thread) = caps.get(3) {
                record.set_field("thread", thread.as_str());
            }
            if let Some(logger) = caps.get(4) {
                record.set_field("logger", logger.as_str());
            }
            record.message = caps[5].to_string();
        } else {
            record.message = line.to_string();
        }

        if record.level.is_empty() {
            record.level = "INFO".to_string();
        }
        if record.timestamp.is_none() {
            record.timestamp = Some(Utc::now());
        }

        extract_key_values(&mut record);
        record.body = record.message.clone();
        record.apply_defaults()
    }

    pub fn validate(&self, line: &str) -> bool {
        pattern().is_match(line)
    }
}

/// Lifts `key=value` pairs out of the message into fields, then trims
/// the message down to whatever precedes the first `{`, matching the
/// source's trailing-structured-data convention.
fn extract_key_values(record: &mut LogRecord) {
    let message = record.message.clone();
    let mut found = false;
    for caps in kv_pattern().captures_iter(&message) {
        found = true;
        let key = &caps[1];
        let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()).unwrap_or("");
        if key != "thread" && key != "logger" {
            record.set_field(key, value);
        }
    }
    if found {
        if let Some(brace) = message.find('{') {
            record.message = message[..brace].trim().to_string();
        }
    }
}

fn parse_log4j_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let normalized = text.replacen(',', ".", 1);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.3f")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_pattern_layout_line() {
        let p = Log4jParser::new();
        let record = p.parse("2024-01-02 03:04:05,123 ERROR [main] com.foo.Bar: disk full");
        assert_eq!(record.level, "ERROR");
        assert_eq!(record.get_field("thread"), "main");
        assert_eq!(record.get_field("logger"), "com.foo.Bar");
        assert_eq!(record.message, "disk full");
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn lifts_key_value_pairs_out_of_message() {
        let p = Log4jParser::new();
        let record = p.parse("2024-01-02 03:04:05,123 INFO request done user=alice code=200 {extra}");
        assert_eq!(record.get_field("user"), "alice");
        assert_eq!(record.get_field("code"), "200");
        assert_eq!(record.message, "request done user=alice code=200");
    }

    #[test]
    fn unparseable_line_falls_back_to_body() {
        let p = Log4jParser::new();
        let record = p.parse("");
        assert_eq!(record.level, "INFO");
    }
}
