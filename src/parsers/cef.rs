// logcore - parsers/cef.rs
//
// Grounded on `original_source/src/cef_parser.cpp`'s `CefParser`: a
// pipe-delimited header (`CEF:version|vendor|product|version|sig|name|
// severity|extension`) matched with a simple `[^|]*` split (no escape
// handling, matching the source), extension key=value pairs parsed with
// one regex pass. `rt`/`deviceCustomDate1` become the timestamp, `msg`
// is appended onto the name-derived message with " - ", everything else
// becomes a field. Severity is mapped through the source's numeric
// (0-10) to INFO/WARNING/ERROR/FATAL table. `validate` matches the
// source's cheap check: starts with `CEF:` and has at least 7 pipes.

use super::LogRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

fn header_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^CEF:(\d+)\|([^|]*)\|([^|]*)\|([^|]*)\|([^|]*)\|([^|]*)\|([^|]*)\|(.*)$")
            .unwrap()
    })
}

fn extension_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)=(?:([^=\s]+)|"([^"]*)")(?:\s+|$)"#).unwrap())
}

fn severity_level(severity: &str) -> &'static str {
    match severity {
        "0" | "1" | "2" | "3" => "INFO",
        "4" | "5" | "6" => "WARNING",
        "7" | "8" | "9" => "ERROR",
        "10" => "FATAL",
        _ => "INFO",
    }
}

#[derive(Debug, Clone, Default)]
pub struct CefParser;

impl CefParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, line: &str) -> LogRecord {
        let mut record = LogRecord::default();

        if let Some(caps) = header_pattern().captures(line) {
            record.set_field("cef_version", &caps[1]);
            record.set_field("device_vendor", &caps[2]);
            record.set_field("device_product", &caps[3]);
            record.set_field("device_version", &caps[4]);
            record.set_field("signature_id", &caps[5]);
            record.message = caps[6].to_string();

            let severity = &caps[7];
            record.set_field("severity", severity);
            record.level = severity_level(severity).to_string();
            record.severity = Some(record.level.clone());

            let mut timestamp_text: Option<String> = None;
            for ext in extension_pattern().captures_iter(&caps[8]) {
                let key = &ext[1];
                let value = ext.get(2).or_else(|| ext.get(3)).map(|m| m.as_str()).unwrap_or("");
                match key {
                    "rt" | "deviceCustomDate1" => timestamp_text = Some(value.to_string()),
                    "msg" => {
                        if !record.message.is_empty() {
                            record.message.push_str(" - ");
                        }
                        record.message.push_str(value);
                    }
                    _ => record.set_field(key, value),
                }
            }
            if let Some(text) = timestamp_text {
                record.timestamp = parse_cef_timestamp(&text);
                if record.timestamp.is_none() {
                    record.set_field("rt", &text);
                }
            }
        } else {
            record.message = line.to_string();
            record.level = "INFO".to_string();
        }

        if record.timestamp.is_none() {
            record.timestamp = Some(Utc::now());
        }
        record.body = record.message.clone();
        record.apply_defaults()
    }

    pub fn validate(&self, line: &str) -> bool {
        line.starts_with("CEF:") && line.matches('|').count() >= 7
    }
}

/// Tries RFC 3339 first, then the `MMM dd yyyy HH:mm:ss` form the source
/// falls back to. Like the source, a value that matches neither (e.g. a
/// bare Unix-epoch-looking string) is not converted; the caller preserves
/// the raw text in a field rather than discarding it, since this crate's
/// `timestamp` is typed and can't hold an unparsed string the way the
/// source's `entry.timestamp` does.
fn parse_cef_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%b %d %Y %H:%M:%S")
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_extension() {
        let p = CefParser::new();
        let record = p.parse(
            "CEF:0|Vendor|Product|1.0|100|Blocked connection|7|src=10.0.0.1 dst=10.0.0.2",
        );
        assert_eq!(record.get_field("device_vendor"), "Vendor");
        assert_eq!(record.get_field("signature_id"), "100");
        assert_eq!(record.message, "Blocked connection");
        assert_eq!(record.level, "ERROR");
        assert_eq!(record.get_field("src"), "10.0.0.1");
        assert_eq!(record.get_field("dst"), "10.0.0.2");
    }

    #[test]
    fn msg_extension_appends_to_message() {
        let p = CefParser::new();
        let record = p.parse("CEF:0|V|P|1.0|1|Name|1|msg=extra detail");
        assert_eq!(record.message, "Name - extra detail");
    }

    #[test]
    fn unparseable_rt_value_is_preserved_as_a_field_not_discarded() {
        let p = CefParser::new();
        let record = p.parse("CEF:0|Vendor|Prod|1.0|100|Login|7|src=10.0.0.1 rt=1700000000");
        assert_eq!(record.get_field("rt"), "1700000000");
        assert_eq!(record.get_field("src"), "10.0.0.1");
    }

    #[test]
    fn validate_requires_cef_prefix_and_pipe_count() {
        let p = CefParser::new();
        assert!(p.validate("CEF:0|a|b|c|d|e|1|"));
        assert!(!p.validate("not cef"));
        assert!(!p.validate("CEF:0|a|b"));
    }
}
