// logcore - parsers/mod.rs
//
// A tagged variant (`ParserKind`) replaces the source's `LogParser`
// inheritance hierarchy (`LogParserFactory::create` dispatching on a
// format string to a virtual `parse`/`validate` pair): one enum, one
// `parse`/`validate` pair dispatching on the tag.

pub mod cef;
pub mod csv;
pub mod drain;
pub mod json;
pub mod line;
pub mod log4j;
pub mod logfmt;
pub mod regex_parser;
pub mod syslog;

use crate::config::LoaderConfig;
use crate::error::{ConfigError, LoaderError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A single parsed log event. Pure data; mirrors the source's
/// `LogRecordObject` minus the folly-specific map/string types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    pub body: String,
    pub template_str: String,
    pub fields: HashMap<String, String>,
    pub severity: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub level: String,
    pub message: String,
}

impl LogRecord {
    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get_field(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Applies the two fallbacks every parser guarantees: a `level` of
    /// `"INFO"` when absent, and `timestamp` defaulting to "now" in UTC
    /// when the format supplied none.
    fn apply_defaults(mut self) -> Self {
        if self.level.is_empty() {
            self.level = "INFO".to_string();
        }
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }
        self
    }
}

/// Dispatch tag for the ten log formats this crate understands, replacing
/// the source's class hierarchy with a single enum + match.
pub enum ParserKind {
    Csv(csv::CsvParser),
    Json(json::JsonParser),
    Jsonl(json::JsonParser),
    Regex(regex_parser::RegexParser),
    Logfmt(logfmt::LogfmtParser),
    Syslog(syslog::SyslogParser),
    Log4j(log4j::Log4jParser),
    Cef(cef::CefParser),
    Line(line::LineParser),
    Drain(drain::DrainMiner),
}

impl ParserKind {
    /// Parse a single logical line into a `LogRecord`. Infallible: formats
    /// that cannot make sense of the line still produce a record with
    /// `body` set to the raw line and the documented fallbacks applied.
    pub fn parse(&self, line: &str) -> LogRecord {
        match self {
            ParserKind::Csv(p) => p.parse(line),
            ParserKind::Json(p) | ParserKind::Jsonl(p) => p.parse(line),
            ParserKind::Regex(p) => p.parse(line),
            ParserKind::Logfmt(p) => p.parse(line),
            ParserKind::Syslog(p) => p.parse(line),
            ParserKind::Log4j(p) => p.parse(line),
            ParserKind::Cef(p) => p.parse(line),
            ParserKind::Line(p) => p.parse(line),
            ParserKind::Drain(p) => p.parse(line),
        }
    }

    pub fn validate(&self, line: &str) -> bool {
        match self {
            ParserKind::Csv(p) => p.validate(line),
            ParserKind::Json(p) | ParserKind::Jsonl(p) => p.validate(line),
            ParserKind::Regex(p) => p.validate(line),
            ParserKind::Logfmt(p) => p.validate(line),
            ParserKind::Syslog(p) => p.validate(line),
            ParserKind::Log4j(p) => p.validate(line),
            ParserKind::Cef(p) => p.validate(line),
            ParserKind::Line(p) => p.validate(line),
            ParserKind::Drain(p) => p.validate(line),
        }
    }
}

/// Builds the `ParserKind` named by a `LoaderConfig`'s `log_type`,
/// compiling `log_pattern` into a `Regex` for the formats that need one.
pub fn build_parser(config: &LoaderConfig) -> Result<ParserKind, LoaderError> {
    use crate::config::LogType;
    Ok(match config.log_type {
        LogType::Csv => ParserKind::Csv(csv::CsvParser::new(
            b',',
            config.dimensions.clone(),
            config.datetime_format.clone(),
        )),
        LogType::Json => ParserKind::Json(json::JsonParser::new()),
        LogType::Jsonl => ParserKind::Jsonl(json::JsonParser::new()),
        LogType::Regex => {
            let pattern = regex::Regex::new(&config.log_pattern).map_err(|e| {
                ConfigError::InvalidRegex {
                    field: "log_pattern",
                    pattern: config.log_pattern.clone(),
                    source: e,
                }
            })?;
            ParserKind::Regex(regex_parser::RegexParser::new(
                pattern,
                config.dimensions.clone(),
                config.datetime_format.clone(),
            ))
        }
        LogType::Drain => ParserKind::Drain(drain::DrainMiner::default()),
        LogType::Logfmt => ParserKind::Logfmt(logfmt::LogfmtParser::new()),
        LogType::Syslog => ParserKind::Syslog(syslog::SyslogParser::new()),
        LogType::Log4j => ParserKind::Log4j(log4j::Log4jParser::new()),
        LogType::Cef => ParserKind::Cef(cef::CefParser::new()),
        LogType::Line => ParserKind::Line(line::LineParser::new()),
    })
}

/// Recognized JSON/JSONL key aliases (spec section 6), shared by the JSON
/// and JSONL parsers since JSONL is line-delimited JSON with identical
/// field mapping. Deliberately excludes `at`, which only `logfmt_parser.cpp`
/// treats as a timestamp alias — a JSON record can have a field literally
/// named `at` that isn't one.
pub(crate) const JSON_TIMESTAMP_KEYS: &[&str] =
    &["time", "timestamp", "ts", "@timestamp", "datetime"];
/// Timestamp key aliases for logfmt, per `logfmt_parser.cpp`.
pub(crate) const LOGFMT_TIMESTAMP_KEYS: &[&str] = &["time", "timestamp", "ts", "at"];
pub(crate) const LEVEL_KEYS: &[&str] = &["level", "severity", "loglevel", "@level"];
pub(crate) const MESSAGE_KEYS: &[&str] = &["msg", "message", "@message", "log"];
