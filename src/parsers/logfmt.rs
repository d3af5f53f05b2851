// logcore - parsers/logfmt.rs
//
// Grounded on `original_source/src/logfmt_parser.cpp`'s `LogfmtParser`:
// one regex pass over `key=value` pairs (`([^=\s]+)=(?:([^"\s][^\s]*)|
// "([^"]*)")`), routing `time`/`timestamp`/`ts`/`at` into the timestamp,
// `level`/`severity`/`loglevel` into the level, `msg`/`message` into the
// message, everything else into a field. If no `msg`/`message` pair was
// present, whatever text follows the last matched pair becomes the
// message, matching the source's "remaining text" fallback.

use super::{LogRecord, LEVEL_KEYS, LOGFMT_TIMESTAMP_KEYS, MESSAGE_KEYS};
use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;

fn kv_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([^=\s]+)=(?:([^"\s][^\s]*)|"([^"]*)")"#).unwrap())
}

#[derive(Debug, Clone, Default)]
pub struct LogfmtParser;

impl LogfmtParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, line: &str) -> LogRecord {
        let mut record = LogRecord::default();
        let mut last_match_end = 0usize;

        for caps in kv_pattern().captures_iter(line) {
            let whole = caps.get(0).unwrap();
            last_match_end = last_match_end.max(whole.end());

            let key = &caps[1];
            let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()).unwrap_or("");
            let key_lower = key.to_lowercase();

            if LOGFMT_TIMESTAMP_KEYS.contains(&key_lower.as_str()) {
                if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
                    record.timestamp = Some(dt.with_timezone(&Utc));
                }
            } else if LEVEL_KEYS.contains(&key_lower.as_str()) {
                record.level = value.to_string();
                record.severity = Some(value.to_string());
            } else if MESSAGE_KEYS.contains(&key_lower.as_str()) {
                record.message = value.to_string();
            } else {
                record.set_field(key, value);
            }
        }

        if record.message.is_empty() && last_match_end < line.len() {
            let remaining = line[last_match_end..].trim();
            if !remaining.is_empty() {
                record.message = remaining.to_string();
            }
        }
        if record.message.is_empty() {
            record.message = line.to_string();
        }
        record.body = record.message.clone();
        record.apply_defaults()
    }

    pub fn validate(&self, line: &str) -> bool {
        kv_pattern().is_match(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_quoted_pairs() {
        let p = LogfmtParser::new();
        let record = p.parse(r#"level=error msg="disk full" code=7"#);
        assert_eq!(record.level, "error");
        assert_eq!(record.message, "disk full");
        assert_eq!(record.get_field("code"), "7");
    }

    #[test]
    fn remaining_text_becomes_message_when_no_msg_key() {
        let p = LogfmtParser::new();
        let record = p.parse(r#"level=error code=7 disk is full"#);
        assert_eq!(record.message, "disk is full");
    }

    #[test]
    fn no_pairs_falls_back_to_whole_line() {
        let p = LogfmtParser::new();
        let record = p.parse("just free text");
        assert_eq!(record.body, "just free text");
        assert_eq!(record.level, "INFO");
    }
}
