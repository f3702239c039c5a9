//! Structured logging setup for gepp
//!
//! Status lines go to stdout through the progress handlers; diagnostics go
//! to stderr through `tracing`, so the two never interleave in a pipe.
//!
//! # Example
//!
//! ```no_run
//! use gepp::util::logging;
//!
//! // GEPP_LOG_LEVEL / GEPP_LOG_JSON / RUST_LOG
//! logging::init_from_env(None);
//!
//! tracing::info!(cluster = "myapp", "Cluster ready");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Crates whose chatter is capped at `warn` unless `RUST_LOG` says otherwise
const NOISY_TARGETS: [&str; 3] = ["hyper", "hyper_util", "bollard"];

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for gepp's own events
    pub level: Level,

    /// One JSON object per line instead of human-readable text
    pub use_json: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            use_json: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Parses a log level, case-insensitively; `None` for anything unknown
pub fn parse_level(level_str: &str) -> Option<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();

    if let Ok(directive) = format!("gepp={}", config.level).parse() {
        filter = filter.add_directive(directive);
    }

    if env::var("RUST_LOG").is_err() {
        for target in NOISY_TARGETS {
            if let Ok(directive) = format!("{}=warn", target).parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    filter
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(&config);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}

/// Reads `GEPP_LOG_LEVEL` and `GEPP_LOG_JSON`. A level given on the command
/// line wins over the environment.
pub fn init_from_env(level_override: Option<&str>) {
    let level_str = level_override
        .map(str::to_string)
        .or_else(|| env::var("GEPP_LOG_LEVEL").ok());

    let level = match level_str.as_deref() {
        Some(s) => parse_level(s).unwrap_or_else(|| {
            eprintln!(
                "Invalid log level '{}', defaulting to warn. Valid levels: trace, debug, info, warn, error",
                s
            );
            Level::WARN
        }),
        None => Level::WARN,
    };

    let use_json = env::var("GEPP_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        include_location: level == Level::TRACE,
    });
}
