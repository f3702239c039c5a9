use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Scaffold, build and deploy a project onto a local k3d cluster
#[derive(Parser, Debug)]
#[command(
    name = "gepp",
    about = "Scaffold, build and deploy a project onto a local k3d cluster",
    version,
    author,
    long_about = "gepp generates a Dockerfile and Kubernetes manifests for a project, builds \
                  its image, provisions a k3d cluster named after it, deploys the manifests \
                  from inside the cluster network, and writes a Terraform stack for a managed \
                  AKS equivalent. Existing files are never overwritten."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose diagnostics on stderr")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress status lines"
    )]
    pub quiet: bool,
}

impl CliArgs {
    /// Level requested on the command line, if any
    pub fn requested_log_level(&self) -> Option<&str> {
        if let Some(level) = &self.log_level {
            Some(level)
        } else if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the whole pipeline",
        long_about = "Generates missing files, builds the image, ensures the cluster, deploys \
                      and writes the Terraform stack. Only a missing entrypoint makes the \
                      command fail; every other problem is reported and skipped.\n\n\
                      Examples:\n  \
                      gepp up\n  \
                      gepp up ./myapp\n  \
                      gepp up --interactive"
    )]
    Up(UpArgs),

    #[command(about = "Generate the Dockerfile and Kubernetes manifests only")]
    Scaffold(ProjectArgs),

    #[command(about = "Show the host ports of an existing cluster's load balancer")]
    Ports(PortsArgs),

    #[command(about = "Write the Terraform stack only")]
    Terraform(TerraformArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(
        value_name = "PATH",
        help = "Project directory (defaults to current directory)"
    )]
    pub project_dir: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn dir(&self) -> PathBuf {
        self.project_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Args, Debug, Clone)]
pub struct UpArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(short = 'i', long, help = "Ask for project settings instead of using defaults")]
    pub interactive: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct PortsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct TerraformArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(long, value_name = "VM_SIZE", help = "Node VM size")]
    pub instance_type: Option<String>,

    #[arg(long, value_name = "REGION", help = "Azure region")]
    pub location: Option<String>,

    #[arg(long, value_name = "NAME", help = "Azure resource group")]
    pub resource_group: Option<String>,

    #[arg(long, value_name = "NAME", help = "AKS cluster name")]
    pub cluster_name: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => super::output::OutputFormat::Human,
            OutputFormatArg::Json => super::output::OutputFormat::Json,
        }
    }
}
