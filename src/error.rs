// logcore - error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every variant carries the structured
// data needed to format a message, rather than a pre-formatted string.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all pipeline operations.
#[derive(Debug)]
pub enum LoaderError {
    /// Malformed configuration, empty required input, inconsistent dimensions.
    InvalidInput { message: String },

    /// A single line failed to parse. Never fatal: accumulated into the
    /// caller's counters rather than propagated as `Err` from the loader.
    Parse(ParseIssue),

    /// Open/read/map failure. Fatal: aborts the producer.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },

    /// Declared encoding is not one of {utf-8, ascii}.
    UnsupportedEncoding { encoding: String },

    /// `predict`/`score` called before `fit` on a model.
    ModelNotFitted { model: &'static str },

    /// An external collaborator (embedding provider) was unavailable.
    /// Non-fatal: the caller degrades gracefully rather than receiving this
    /// as a hard `Err` from `search`; this variant exists for the cases
    /// (template-store construction, config validation) where the failure
    /// does need to be reported up front.
    ExternalUnavailable { provider: &'static str },

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Template-store persistence failed.
    Store(StoreError),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { message } => write!(f, "invalid input: {message}"),
            Self::Parse(issue) => write!(f, "parse error: {issue}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
            Self::UnsupportedEncoding { encoding } => {
                write!(f, "unsupported encoding '{encoding}', expected utf-8 or ascii")
            }
            Self::ModelNotFitted { model } => {
                write!(f, "{model} has not been fitted; call fit() first")
            }
            Self::ExternalUnavailable { provider } => {
                write!(f, "external collaborator '{provider}' unavailable")
            }
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Store(e) => write!(f, "template store error: {e}"),
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Config(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse issues (non-fatal, per-line)
// ---------------------------------------------------------------------------

/// A single line-level parse failure. Accumulated by workers, never aborts
/// the pipeline.
#[derive(Debug, Clone)]
pub struct ParseIssue {
    pub line_number: u64,
    pub format: &'static str,
    pub reason: String,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} ({}): {}",
            self.line_number, self.format, self.reason
        )
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to `LoaderConfig` loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A required field is missing or empty.
    MissingField { field: &'static str },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A regex pattern in the configuration is invalid.
    InvalidRegex {
        field: &'static str,
        pattern: String,
        source: regex::Error,
    },

    /// I/O error reading a config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "failed to parse TOML '{}': {source}", path.display())
            }
            Self::MissingField { field } => write!(f, "missing required field '{field}'"),
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(f, "'{field}' = '{value}' is out of range, expected {expected}"),
            Self::InvalidRegex {
                field,
                pattern,
                source,
            } => write!(f, "invalid regex in '{field}' ('{pattern}'): {source}"),
            Self::Io { path, source } => {
                write!(f, "I/O error reading '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LoaderError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Template store errors
// ---------------------------------------------------------------------------

/// Errors related to template-store persistence.
#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "I/O error at '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON error at '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<StoreError> for LoaderError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Convenience type alias for pipeline results.
pub type Result<T> = std::result::Result<T, LoaderError>;
