// logcore - parsers/regex_parser.rs
//
// Positional capture-group parser. `original_source/src/regex_parser.cpp`
// intends to dispatch captures by dimension name (`body`/`timestamp`/
// `severity`) but never actually can: it names each group with
// `std::to_string(i)`, which can never equal the string literals it
// compares against, so every capture there silently lands in
// `attributes` keyed by its numeric index and `config.dimensions` goes
// unused. This implements the dispatch the original's branches were
// clearly meant to perform: group `i` maps to the dimension named at
// `dimensions[i]` when configured, else falls back to an indexed field.

use super::LogRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

#[derive(Debug, Clone)]
pub struct RegexParser {
    pub pattern: Regex,
    pub dimensions: Vec<String>,
    pub datetime_format: String,
}

impl RegexParser {
    pub fn new(pattern: Regex, dimensions: Vec<String>, datetime_format: String) -> Self {
        Self {
            pattern,
            dimensions,
            datetime_format,
        }
    }

    pub fn parse(&self, line: &str) -> LogRecord {
        let mut record = LogRecord::default();
        if let Some(caps) = self.pattern.captures(line) {
            for i in 1..caps.len() {
                let Some(m) = caps.get(i) else { continue };
                let value = m.as_str();
                let dim = self.dimensions.get(i - 1).filter(|d| !d.is_empty());
                match dim.map(String::as_str) {
                    Some("body") => record.body = value.to_string(),
                    Some("timestamp") => {
                        record.timestamp = parse_with_format(value, &self.datetime_format);
                    }
                    Some("severity") => record.severity = Some(value.to_string()),
                    Some(other) => record.set_field(other, value),
                    None => record.set_field(i.to_string(), value),
                }
            }
        }
        if record.body.is_empty() {
            record.body = line.to_string();
        }
        record.message = record.body.clone();
        record.level = record.severity.clone().unwrap_or_default();
        record.apply_defaults()
    }

    pub fn validate(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

fn parse_with_format(value: &str, format: &str) -> Option<DateTime<Utc>> {
    if format.is_empty() {
        return DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}
