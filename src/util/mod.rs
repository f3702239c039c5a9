//! Utility modules for gepp

pub mod logging;

pub use logging::{init_from_env, init_logging, LoggingConfig};
