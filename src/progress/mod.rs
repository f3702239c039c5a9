//! Progress reporting for pipeline runs

mod console;
mod handler;
mod logging;

pub use console::ConsoleHandler;
pub use handler::{FanOut, NoOpHandler, ProgressEvent, ProgressHandler};
pub use logging::LoggingHandler;
