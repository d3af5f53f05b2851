// logcore - config.rs
//
// Typed configuration surface for the loader pipeline (spec section 6),
// built the way the source crate builds format profiles: a raw
// `#[derive(Deserialize)]` struct is parsed from TOML first, then validated
// and compiled into the runtime `LoaderConfig` so malformed input is
// rejected with a specific message rather than a generic deserialize error.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

/// Text encodings the loader accepts. Anything else is a fatal
/// `UnsupportedEncoding` at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" => Ok(Self::Ascii),
            other => Err(other.to_string()),
        }
    }
}

/// Which parser the loader dispatches to. Mirrors `ParserKind` in
/// `parsers::mod` but is the wire/config-facing spelling of the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Csv,
    Json,
    Jsonl,
    Regex,
    Drain,
    Logfmt,
    Syslog,
    Log4j,
    Cef,
    Line,
}

/// Adaptive batch-sizing thresholds (spec section 4.5 / 9: implementation
/// defined, exposed as configuration).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSizing {
    pub initial: usize,
    pub min: usize,
    pub max: usize,
    pub queue_high_watermark: usize,
    pub queue_low_watermark: usize,
}

impl Default for BatchSizing {
    fn default() -> Self {
        Self {
            initial: 100,
            min: 10,
            max: 1000,
            queue_high_watermark: 200,
            queue_low_watermark: 10,
        }
    }
}

/// Runtime, validated loader configuration. Construct directly, or via
/// [`LoaderConfig::from_toml`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub file_path: PathBuf,
    pub log_type: LogType,
    pub log_pattern: String,
    pub datetime_format: String,
    pub dimensions: Vec<String>,
    pub num_threads: usize,
    pub batch_sizing: BatchSizing,
    pub use_memory_mapping: bool,
    pub use_simd: bool,
    pub enable_preprocessing: bool,
    pub encoding: Encoding,
    pub max_line_length: usize,
    pub max_parse_errors_logged: usize,
}

impl LoaderConfig {
    /// Parse and validate a TOML configuration document.
    pub fn from_toml(toml_content: &str, source_path: &PathBuf) -> Result<Self, ConfigError> {
        let raw: RawLoaderConfig =
            toml::from_str(toml_content).map_err(|e| ConfigError::TomlParse {
                path: source_path.clone(),
                source: e,
            })?;
        raw.validate()
    }

    /// Build a minimal valid configuration for the given file and format,
    /// with every other field at its documented default. Convenience for
    /// hosts and tests that do not need the full TOML surface.
    pub fn new(file_path: impl Into<PathBuf>, log_type: LogType) -> Self {
        Self {
            file_path: file_path.into(),
            log_type,
            log_pattern: String::new(),
            datetime_format: String::new(),
            dimensions: Vec::new(),
            num_threads: 0,
            batch_sizing: BatchSizing::default(),
            use_memory_mapping: true,
            use_simd: true,
            enable_preprocessing: false,
            encoding: Encoding::Utf8,
            max_line_length: 1024 * 1024,
            max_parse_errors_logged: 10,
        }
    }

    /// Resolved worker thread count: `num_threads` verbatim, or the host's
    /// available parallelism when configured as 0 ("hardware default").
    pub fn resolved_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.num_threads
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLoaderConfig {
    file_path: String,
    log_type: LogType,
    #[serde(default)]
    log_pattern: String,
    #[serde(default)]
    datetime_format: String,
    #[serde(default)]
    dimensions: Vec<String>,
    #[serde(default)]
    num_threads: usize,
    #[serde(default)]
    batch_size: Option<usize>,
    #[serde(default)]
    min_batch_size: Option<usize>,
    #[serde(default)]
    max_batch_size: Option<usize>,
    #[serde(default)]
    queue_high_watermark: Option<usize>,
    #[serde(default)]
    queue_low_watermark: Option<usize>,
    #[serde(default = "default_true")]
    use_memory_mapping: bool,
    #[serde(default = "default_true")]
    use_simd: bool,
    #[serde(default)]
    enable_preprocessing: bool,
    #[serde(default = "default_encoding")]
    encoding: String,
    #[serde(default = "default_max_line_length")]
    max_line_length: usize,
    #[serde(default = "default_max_parse_errors_logged")]
    max_parse_errors_logged: usize,
}

fn default_true() -> bool {
    true
}
fn default_encoding() -> String {
    "utf-8".to_string()
}
fn default_max_line_length() -> usize {
    1024 * 1024
}
fn default_max_parse_errors_logged() -> usize {
    10
}

impl RawLoaderConfig {
    fn validate(self) -> Result<LoaderConfig, ConfigError> {
        if self.file_path.is_empty() {
            return Err(ConfigError::MissingField { field: "file_path" });
        }
        let encoding = self
            .encoding
            .parse::<Encoding>()
            .map_err(|_| ConfigError::ValueOutOfRange {
                field: "encoding",
                value: self.encoding.clone(),
                expected: "utf-8 or ascii",
            })?;

        let defaults = BatchSizing::default();
        let min = self.min_batch_size.unwrap_or(defaults.min);
        let max = self.max_batch_size.unwrap_or(defaults.max);
        if min == 0 || max < min {
            return Err(ConfigError::ValueOutOfRange {
                field: "min_batch_size/max_batch_size",
                value: format!("min={min}, max={max}"),
                expected: "0 < min <= max",
            });
        }
        let initial = self
            .batch_size
            .unwrap_or(defaults.initial)
            .clamp(min, max);

        if !self.log_pattern.is_empty() {
            regex::Regex::new(&self.log_pattern).map_err(|e| ConfigError::InvalidRegex {
                field: "log_pattern",
                pattern: self.log_pattern.clone(),
                source: e,
            })?;
        }

        Ok(LoaderConfig {
            file_path: PathBuf::from(self.file_path),
            log_type: self.log_type,
            log_pattern: self.log_pattern,
            datetime_format: self.datetime_format,
            dimensions: self.dimensions,
            num_threads: self.num_threads,
            batch_sizing: BatchSizing {
                initial,
                min,
                max,
                queue_high_watermark: self
                    .queue_high_watermark
                    .unwrap_or(defaults.queue_high_watermark),
                queue_low_watermark: self
                    .queue_low_watermark
                    .unwrap_or(defaults.queue_low_watermark),
            },
            use_memory_mapping: self.use_memory_mapping,
            use_simd: self.use_simd,
            enable_preprocessing: self.enable_preprocessing,
            encoding,
            max_line_length: self.max_line_length,
            max_parse_errors_logged: self.max_parse_errors_logged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let toml = r#"
            file_path = "input.log"
            log_type = "line"
        "#;
        let cfg = LoaderConfig::from_toml(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(cfg.log_type, LogType::Line);
        assert_eq!(cfg.batch_sizing, BatchSizing::default());
        assert_eq!(cfg.encoding, Encoding::Utf8);
        assert!(cfg.use_memory_mapping);
    }

    #[test]
    fn missing_file_path_is_rejected() {
        let toml = r#"log_type = "line""#;
        let err = toml::from_str::<RawLoaderConfig>(toml);
        assert!(err.is_err(), "log_type present but file_path missing should fail at toml level");
    }

    #[test]
    fn empty_file_path_field_is_rejected() {
        let toml = r#"
            file_path = ""
            log_type = "line"
        "#;
        let err = LoaderConfig::from_toml(toml, &PathBuf::from("test.toml"));
        assert!(matches!(err, Err(ConfigError::MissingField { field: "file_path" })));
    }

    #[test]
    fn bad_encoding_is_rejected() {
        let toml = r#"
            file_path = "input.log"
            log_type = "line"
            encoding = "latin1"
        "#;
        let err = LoaderConfig::from_toml(toml, &PathBuf::from("test.toml"));
        assert!(matches!(err, Err(ConfigError::ValueOutOfRange { field: "encoding", .. })));
    }

    #[test]
    fn batch_size_clamped_into_min_max() {
        let toml = r#"
            file_path = "input.log"
            log_type = "line"
            batch_size = 5000
            min_batch_size = 10
            max_batch_size = 1000
        "#;
        let cfg = LoaderConfig::from_toml(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(cfg.batch_sizing.initial, 1000);
    }

    #[test]
    fn inverted_min_max_is_rejected() {
        let toml = r#"
            file_path = "input.log"
            log_type = "line"
            min_batch_size = 500
            max_batch_size = 10
        "#;
        let err = LoaderConfig::from_toml(toml, &PathBuf::from("test.toml"));
        assert!(err.is_err());
    }

    #[test]
    fn invalid_log_pattern_regex_is_rejected() {
        let toml = r#"
            file_path = "input.log"
            log_type = "regex"
            log_pattern = "(unclosed"
        "#;
        let err = LoaderConfig::from_toml(toml, &PathBuf::from("test.toml"));
        assert!(matches!(err, Err(ConfigError::InvalidRegex { .. })));
    }

    #[test]
    fn resolved_num_threads_zero_means_available_parallelism() {
        let cfg = LoaderConfig::new("x.log", LogType::Line);
        assert!(cfg.resolved_num_threads() >= 1);
    }
}
