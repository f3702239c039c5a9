//! Subcommand handlers; each returns the process exit code

use super::commands::{PortsArgs, ProjectArgs, TerraformArgs, UpArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::GeppConfig;
use crate::pipeline::{ProjectPipeline, Stage};
use crate::progress::{ConsoleHandler, FanOut, LoggingHandler, ProgressHandler};
use crate::source::{ConfigSource, DefaultConfig, InteractiveConfig};
use crate::terraform::{write_stack, AksStackParams};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

fn progress_handler(console: bool) -> Arc<dyn ProgressHandler> {
    if console {
        Arc::new(FanOut::new(vec![
            Arc::new(ConsoleHandler::stdout()),
            Arc::new(LoggingHandler),
        ]))
    } else {
        Arc::new(LoggingHandler)
    }
}

fn load_config() -> GeppConfig {
    let config = GeppConfig::default().with_fallbacks();
    debug!("{}", config);
    config
}

fn report_error(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub async fn handle_up(args: &UpArgs, quiet: bool) -> i32 {
    report_error(run_up(args, quiet).await)
}

async fn run_up(args: &UpArgs, quiet: bool) -> Result<i32> {
    let config = load_config();
    let human = args.format == super::commands::OutputFormatArg::Human;
    let pipeline = ProjectPipeline::connect(config, progress_handler(human && !quiet));

    let mut source: Box<dyn ConfigSource> = if args.interactive {
        Box::new(InteractiveConfig::stdio())
    } else {
        Box::new(DefaultConfig)
    };

    let build = pipeline
        .prepare(&args.project.dir(), source.as_mut())
        .await
        .context("Failed to prepare project")?;
    let report = pipeline.run(&build, &Stage::ALL).await;

    // Human output already streamed status lines; it ends with the stage table
    if !(human && quiet) {
        let output = OutputFormatter::new(OutputFormat::from(args.format)).format_report(&report)?;
        if human {
            print!("{}", output);
        } else {
            println!("{}", output);
        }
    }

    Ok(report.exit_code())
}

pub async fn handle_scaffold(args: &ProjectArgs, quiet: bool) -> i32 {
    report_error(run_scaffold(args, quiet).await)
}

async fn run_scaffold(args: &ProjectArgs, quiet: bool) -> Result<i32> {
    let config = load_config();
    let pipeline = ProjectPipeline::connect(config, progress_handler(!quiet));

    let build = pipeline
        .prepare(&args.dir(), &mut DefaultConfig)
        .await
        .context("Failed to prepare project")?;
    let report = pipeline.run(&build, &Stage::SCAFFOLD).await;

    Ok(report.exit_code())
}

pub async fn handle_ports(args: &PortsArgs) -> i32 {
    report_error(run_ports(args).await)
}

async fn run_ports(args: &PortsArgs) -> Result<i32> {
    let config = load_config();
    let pipeline = ProjectPipeline::connect(config, progress_handler(false));

    let build = pipeline
        .prepare(&args.project.dir(), &mut DefaultConfig)
        .await
        .context("Failed to prepare project")?;
    let ports = pipeline
        .ports(&build)
        .await
        .with_context(|| format!("Cannot inspect cluster '{}'", build.app_name))?;

    let output = OutputFormatter::new(args.format.into()).format_ports(&ports)?;
    print!("{}", output);
    Ok(0)
}

pub async fn handle_terraform(args: &TerraformArgs, quiet: bool) -> i32 {
    report_error(run_terraform(args, quiet).await)
}

async fn run_terraform(args: &TerraformArgs, quiet: bool) -> Result<i32> {
    let config = load_config();
    let pipeline = ProjectPipeline::connect(config, progress_handler(false));

    let build = pipeline
        .prepare(&args.project.dir(), &mut DefaultConfig)
        .await
        .context("Failed to prepare project")?;

    let mut params = AksStackParams::default();
    if let Some(v) = &args.instance_type {
        params.instance_type = v.clone();
    }
    if let Some(v) = &args.location {
        params.location = v.clone();
    }
    if let Some(v) = &args.resource_group {
        params.resource_group = v.clone();
    }
    if let Some(v) = &args.cluster_name {
        params.cluster_name = v.clone();
    }

    let path = write_stack(&build.project_dir, &build.app_name, &params)?;
    if !quiet {
        println!("{}", path.display());
    }
    Ok(0)
}
