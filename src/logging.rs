// logcore - logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - Host-supplied debug flag (sets "debug")
//   - Config-supplied level
//
// Output: stderr. No CLI or log-file sink is specified here (out of scope);
// a host embedding this crate is free to install its own `tracing`
// subscriber instead of calling `init`.

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";
const APP_NAME: &str = "logcore";
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialise the logging subsystem.
///
/// `debug_flag` is true when the host wants verbose output.
/// `config_level` is the level from the host's configuration, if any.
///
/// Priority: RUST_LOG env var > debug flag > config level > default "info".
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level.to_string())
    } else {
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .init();

    tracing::debug!(app = APP_NAME, version = APP_VERSION, "logging initialised");
}
