pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, PortsArgs, ProjectArgs, TerraformArgs, UpArgs};
pub use output::{OutputFormat, OutputFormatter};
