// logcore - parsers/line.rs
//
// The fallback format: no structure is assumed, the whole line becomes
// body/message, level defaults to INFO and timestamp to ingest time.
// Always validates.

use super::LogRecord;

#[derive(Debug, Clone, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, line: &str) -> LogRecord {
        let mut record = LogRecord::default();
        record.body = line.to_string();
        record.message = line.to_string();
        record.apply_defaults()
    }

    pub fn validate(&self, _line: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_line_becomes_body_and_message() {
        let p = LineParser::new();
        let record = p.parse("anything goes here");
        assert_eq!(record.body, "anything goes here");
        assert_eq!(record.message, "anything goes here");
        assert_eq!(record.level, "INFO");
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn always_validates() {
        let p = LineParser::new();
        assert!(p.validate(""));
        assert!(p.validate("literally anything"));
    }
}
