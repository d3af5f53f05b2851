// logcore - parsers/syslog.rs
//
// Grounded on `original_source/src/syslog_parser.cpp`'s `SyslogParser`:
// priority is extracted from an unanchored `<NNN>` prefix (facility =
// pri >> 3, severity = pri & 0x7), the remainder is matched against a
// single regex accepting either BSD (`Mmm dd hh:mm:ss`) or ISO 8601
// timestamps, then optional hostname and `program[pid]:` fields, with
// everything left over taken as the message. Severity names and the
// facility table are copied from the source's maps verbatim; unparsed
// lines fall back to the whole line as the message with level `INFO`.

use super::LogRecord;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

const SEVERITY_NAMES: [&str; 8] = [
    "EMERG", "ALERT", "CRIT", "ERR", "WARNING", "NOTICE", "INFO", "DEBUG",
];

const FACILITY_NAMES: [&str; 24] = [
    "kern", "user", "mail", "daemon", "auth", "syslog", "lpr", "news", "uucp", "cron",
    "authpriv", "ftp", "ntp", "security", "console", "mark", "local0", "local1", "local2",
    "local3", "local4", "local5", "local6", "local7",
];

fn priority_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<(\d{1,3})>").unwrap())
}

fn syslog_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:([A-Za-z]{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})|",
            r"(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?))?\s*",
            r"(?:(\w+|\d+(?:\.\d+){3})\s+)?",
            r"(?:(\w+(?:\[\d+\])?):)?\s*",
            r"(.*)$",
        ))
        .unwrap()
    })
}

#[derive(Debug, Clone, Default)]
pub struct SyslogParser;

impl SyslogParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, line: &str) -> LogRecord {
        let mut record = LogRecord::default();
        let mut rest = line;

        if let Some(caps) = priority_pattern().captures(line) {
            if let Ok(priority) = caps[1].parse::<u32>() {
                let facility = (priority >> 3) as usize;
                let severity = (priority & 0x7) as usize;
                record.set_field(
                    "facility",
                    FACILITY_NAMES
                        .get(facility)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| facility.to_string()),
                );
                record.level = SEVERITY_NAMES[severity].to_string();
                record.severity = Some(record.level.clone());
            }
            rest = &line[caps[0].len()..];
        }

        if let Some(caps) = syslog_pattern().captures(rest) {
            let timestamp_text = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            if let Some(text) = timestamp_text {
                record.timestamp = if caps.get(1).is_some() {
                    parse_bsd_timestamp(text)
                } else {
                    DateTime::parse_from_rfc3339(text)
                        .map(|dt| dt.with_timezone(&Utc))
                        .ok()
                };
            }
            if let Some(host) = caps.get(3) {
                record.set_field("host", host.as_str());
            }
            if let Some(prog) = caps.get(4) {
                set_program_and_pid(&mut record, prog.as_str());
            }
            record.message = caps[5].to_string();
            record.body = record.message.clone();
        } else {
            record.message = rest.to_string();
            record.body = rest.to_string();
        }

        if record.level.is_empty() {
            record.level = "INFO".to_string();
        }
        if record.timestamp.is_none() {
            record.timestamp = Some(Utc::now());
        }
        record.apply_defaults()
    }

    pub fn validate(&self, line: &str) -> bool {
        let rest = match priority_pattern().find(line) {
            Some(m) => &line[m.end()..],
            None => line,
        };
        syslog_pattern().is_match(rest)
    }
}

fn set_program_and_pid(record: &mut LogRecord, prog: &str) {
    match prog.find('[') {
        Some(start) => {
            record.set_field("program", &prog[..start]);
            if let Some(end) = prog.find(']') {
                record.set_field("pid", &prog[start + 1..end]);
            }
        }
        None => record.set_field("program", prog),
    }
}

/// BSD syslog timestamps carry no year; the current UTC year is assumed,
/// matching the source's use of the ingest-time clock.
fn parse_bsd_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let year = Utc::now().year();
    let with_year = format!("{year} {text}");
    NaiveDateTime::parse_from_str(&with_year, "%Y %b %e %H:%M:%S")
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_bsd_line() {
        let p = SyslogParser::new();
        let record = p.parse("<34>Oct 11 22:14:15 mymachine su: 'su root' failed for lonvick");
        assert_eq!(record.level, "CRIT");
        assert_eq!(record.get_field("host"), "mymachine");
        assert_eq!(record.get_field("program"), "su");
        assert_eq!(record.message, "'su root' failed for lonvick");
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn parses_program_with_pid() {
        let p = SyslogParser::new();
        let record = p.parse("<13>Jan  5 00:01:02 host sshd[1234]: accepted password");
        assert_eq!(record.get_field("program"), "sshd");
        assert_eq!(record.get_field("pid"), "1234");
    }

    #[test]
    fn missing_priority_still_parses_remainder() {
        let p = SyslogParser::new();
        let record = p.parse("Oct 11 22:14:15 mymachine su: failed");
        assert_eq!(record.get_field("host"), "mymachine");
        assert_eq!(record.level, "INFO");
    }

    #[test]
    fn unparseable_line_falls_back_to_body() {
        let p = SyslogParser::new();
        let record = p.parse("");
        assert_eq!(record.body, "");
    }
}
