// logcore - preprocess.rs
//
// Regex-driven masking and extraction of structured entities, run before
// tokenization/parsing. Grounded on the source's `Preprocessor`/
// `PreprocessorConfig`; the DuckDB-backed `group_log_index` method is out
// of scope here (SQL/relational storage is an explicit non-goal) and has
// no counterpart in this crate.

use crate::error::{ConfigError, LoaderError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::HashMap;

/// Attribute keys `identify_timestamp` checks when the body itself yields
/// no match.
const TIMESTAMP_ATTRIBUTE_KEYS: &[&str] = &["timestamp", "time", "date", "datetime", "created_at"];

/// Fixed, ordered set of timestamp formats tried against free text.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S",
    "%d/%b/%Y:%H:%M:%S",
    "%b %d %H:%M:%S",
];

/// Batches larger than this are preprocessed on the crate's shared rayon
/// pool instead of sequentially.
const PARALLEL_BATCH_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct PreprocessorConfig {
    /// Patterns, each replaced by a single space during normalization.
    pub custom_delimiters_regex: Vec<String>,
    /// Ordered `(pattern, replacement_token)` pairs applied after delimiter
    /// normalization; every match is recorded under the replacement key.
    pub custom_replace_list: Vec<(String, String)>,
    /// When true, delimiter normalization uses the SIMD character-class
    /// replacement plus space collapsing and trim; custom replacements
    /// always use regex regardless of this flag.
    pub use_simd: bool,
}

impl PreprocessorConfig {
    pub fn new(
        custom_delimiters_regex: Vec<String>,
        custom_replace_list: Vec<(String, String)>,
        use_simd: bool,
    ) -> Self {
        Self {
            custom_delimiters_regex,
            custom_replace_list,
            use_simd,
        }
    }
}

/// Per-line extracted terms, keyed by replacement token.
pub type ExtractedTerms = HashMap<String, Vec<String>>;

pub struct Preprocessor {
    config: PreprocessorConfig,
    delimiter_regexes: Vec<Regex>,
    delimiter_chars: Vec<char>,
    replacement_regexes: Vec<(Regex, String)>,
}

impl Preprocessor {
    pub fn new(config: PreprocessorConfig) -> Result<Self, LoaderError> {
        let mut delimiter_regexes = Vec::with_capacity(config.custom_delimiters_regex.len());
        let mut delimiter_chars = Vec::new();
        for pattern in &config.custom_delimiters_regex {
            let re = Regex::new(pattern).map_err(|e| {
                LoaderError::Config(ConfigError::InvalidRegex {
                    field: "custom_delimiters_regex",
                    pattern: pattern.clone(),
                    source: e,
                })
            })?;
            // A single-character literal pattern can be folded into the
            // SIMD char-class replacement path; anything richer stays regex.
            if pattern.chars().count() == 1 {
                delimiter_chars.push(pattern.chars().next().unwrap());
            }
            delimiter_regexes.push(re);
        }

        let mut replacement_regexes = Vec::with_capacity(config.custom_replace_list.len());
        for (pattern, token) in &config.custom_replace_list {
            let re = Regex::new(pattern).map_err(|e| {
                LoaderError::Config(ConfigError::InvalidRegex {
                    field: "custom_replace_list",
                    pattern: pattern.clone(),
                    source: e,
                })
            })?;
            replacement_regexes.push((re, token.clone()));
        }

        Ok(Self {
            config,
            delimiter_regexes,
            delimiter_chars,
            replacement_regexes,
        })
    }

    /// Clean a single line, returning the cleaned text plus any terms
    /// extracted by `custom_replace_list`.
    pub fn clean_line(&self, logline: &str) -> (String, ExtractedTerms) {
        if self.config.use_simd {
            self.clean_line_simd(logline)
        } else {
            self.clean_line_regex(logline)
        }
    }

    fn clean_line_regex(&self, logline: &str) -> (String, ExtractedTerms) {
        let mut cleaned = logline.to_string();
        for re in &self.delimiter_regexes {
            cleaned = re.replace_all(&cleaned, " ").into_owned();
        }
        self.apply_replacements(&cleaned)
    }

    fn clean_line_simd(&self, logline: &str) -> (String, ExtractedTerms) {
        let mut cleaned = if self.delimiter_chars.is_empty() {
            logline.to_string()
        } else {
            crate::simd::replace_chars(logline, &self.delimiter_chars, ' ')
        };
        // Any multi-character delimiter pattern still needs regex even in
        // SIMD mode; only single-character literals take the fast path.
        for (re, pattern) in self
            .delimiter_regexes
            .iter()
            .zip(&self.config.custom_delimiters_regex)
        {
            if pattern.chars().count() != 1 {
                cleaned = re.replace_all(&cleaned, " ").into_owned();
            }
        }
        cleaned = collapse_spaces(&cleaned);
        let trimmed = crate::simd::trim(&cleaned).to_string();
        self.apply_replacements(&trimmed)
    }

    fn apply_replacements(&self, input: &str) -> (String, ExtractedTerms) {
        let mut extracted: ExtractedTerms = HashMap::new();
        let mut cleaned = input.to_string();
        for (re, token) in &self.replacement_regexes {
            let mut matches = Vec::new();
            for m in re.find_iter(&cleaned) {
                matches.push(m.as_str().to_string());
            }
            if !matches.is_empty() {
                extracted.entry(token.clone()).or_default().extend(matches);
                cleaned = re.replace_all(&cleaned, token.as_str()).into_owned();
            }
        }
        (cleaned, extracted)
    }

    /// Clean a batch of lines. Parallelized on the crate's shared rayon
    /// pool once the batch exceeds `PARALLEL_BATCH_THRESHOLD` lines.
    pub fn clean_batch(&self, loglines: &[String]) -> (Vec<String>, Vec<ExtractedTerms>) {
        if loglines.len() >= PARALLEL_BATCH_THRESHOLD {
            use rayon::prelude::*;
            loglines
                .par_iter()
                .map(|line| self.clean_line(line))
                .unzip()
        } else {
            loglines.iter().map(|line| self.clean_line(line)).unzip()
        }
    }

    /// Try the fixed ordered set of formats against `body`, then against
    /// each attribute key in `TIMESTAMP_ATTRIBUTE_KEYS`.
    pub fn identify_timestamp(
        &self,
        body: &str,
        attributes: &HashMap<String, String>,
    ) -> Option<DateTime<Utc>> {
        if let Some(ts) = try_parse_any_format(body) {
            return Some(ts);
        }
        for key in TIMESTAMP_ATTRIBUTE_KEYS {
            if let Some(value) = attributes.get(*key) {
                if let Some(ts) = try_parse_any_format(value) {
                    return Some(ts);
                }
            }
        }
        None
    }
}

fn try_parse_any_format(text: &str) -> Option<DateTime<Utc>> {
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(
                date.and_hms_opt(0, 0, 0).unwrap(),
                Utc,
            ));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

fn collapse_spaces(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for c in input.chars() {
        if c == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_replacement_and_space_collapse() {
        let cfg = PreprocessorConfig::new(vec![",".to_string()], vec![], false);
        let pp = Preprocessor::new(cfg).unwrap();
        let (cleaned, extracted) = pp.clean_line("a,b,,c");
        assert_eq!(cleaned, "a b  c");
        assert!(extracted.is_empty());
    }

    #[test]
    fn simd_path_collapses_and_trims() {
        let cfg = PreprocessorConfig::new(vec![",".to_string()], vec![], true);
        let pp = Preprocessor::new(cfg).unwrap();
        let (cleaned, _) = pp.clean_line(" a,b,,c ");
        assert_eq!(cleaned, "a b c");
    }

    #[test]
    fn custom_replace_extracts_and_masks() {
        let cfg = PreprocessorConfig::new(
            vec![],
            vec![(r"\d+".to_string(), "<NUM>".to_string())],
            false,
        );
        let pp = Preprocessor::new(cfg).unwrap();
        let (cleaned, extracted) = pp.clean_line("user 42 logged in at 7");
        assert_eq!(cleaned, "user <NUM> logged in at <NUM>");
        assert_eq!(extracted.get("<NUM>").unwrap(), &vec!["42", "7"]);
    }

    #[test]
    fn invalid_regex_fails_construction() {
        let cfg = PreprocessorConfig::new(vec!["(unclosed".to_string()], vec![], false);
        assert!(Preprocessor::new(cfg).is_err());
    }

    #[test]
    fn clean_batch_matches_clean_line_regardless_of_size() {
        let cfg = PreprocessorConfig::new(vec![",".to_string()], vec![], false);
        let pp = Preprocessor::new(cfg).unwrap();
        let small: Vec<String> = vec!["a,b".to_string(), "c,d".to_string()];
        let (cleaned_small, _) = pp.clean_batch(&small);
        assert_eq!(cleaned_small, vec!["a b".to_string(), "c d".to_string()]);

        let large: Vec<String> = (0..1500).map(|i| format!("x,{i}")).collect();
        let (cleaned_large, _) = pp.clean_batch(&large);
        assert_eq!(cleaned_large.len(), 1500);
        assert_eq!(cleaned_large[0], "x 0");
    }

    #[test]
    fn identify_timestamp_from_body() {
        let cfg = PreprocessorConfig::default();
        let pp = Preprocessor::new(cfg).unwrap();
        let ts = pp.identify_timestamp("2024-01-02 03:04:05", &HashMap::new());
        assert!(ts.is_some());
    }

    #[test]
    fn identify_timestamp_from_attribute_key() {
        let cfg = PreprocessorConfig::default();
        let pp = Preprocessor::new(cfg).unwrap();
        let mut attrs = HashMap::new();
        attrs.insert("timestamp".to_string(), "2024-01-02 03:04:05".to_string());
        let ts = pp.identify_timestamp("no timestamp here", &attrs);
        assert!(ts.is_some());
    }

    #[test]
    fn identify_timestamp_none_when_absent() {
        let cfg = PreprocessorConfig::default();
        let pp = Preprocessor::new(cfg).unwrap();
        assert!(pp.identify_timestamp("nothing to see", &HashMap::new()).is_none());
    }
}
