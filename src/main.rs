use gepp::cli::commands::{CliArgs, Commands};
use gepp::cli::handlers::{handle_ports, handle_scaffold, handle_terraform, handle_up};
use gepp::util::logging;
use gepp::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    logging::init_from_env(args.requested_log_level());

    debug!("gepp v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Up(up_args) => handle_up(up_args, args.quiet).await,
        Commands::Scaffold(project_args) => handle_scaffold(project_args, args.quiet).await,
        Commands::Ports(ports_args) => handle_ports(ports_args).await,
        Commands::Terraform(tf_args) => handle_terraform(tf_args, args.quiet).await,
    };

    std::process::exit(exit_code);
}
