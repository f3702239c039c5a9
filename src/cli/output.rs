//! Output formatting for pipeline reports and port maps
//!
//! Human output is for terminals; JSON output is stable enough for scripts.
//!
//! # Example
//!
//! ```ignore
//! use gepp::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_report(&report)?);
//! ```

use anyhow::{Context, Result};
use serde::Serialize;

use crate::context::PortMap;
use crate::pipeline::{PipelineReport, StageOutcome};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// Human-readable formatted text
    Human,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StageSummary {
    stage: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportSummary {
    exit_code: i32,
    total_time_ms: u128,
    stages: Vec<StageSummary>,
    image: Option<String>,
    cluster: Option<String>,
    http_url: Option<String>,
    https_url: Option<String>,
    created: Vec<String>,
    terraform: Option<String>,
}

impl ReportSummary {
    fn from_report(report: &PipelineReport) -> Self {
        let stages = report
            .stages
            .iter()
            .map(|record| {
                let (outcome, policy, detail) = match &record.outcome {
                    StageOutcome::Completed => ("completed", None, None),
                    StageOutcome::Skipped { reason } => ("skipped", None, Some(reason.clone())),
                    StageOutcome::Failed { policy, error } => {
                        ("failed", Some(policy.to_string()), Some(error.clone()))
                    }
                    StageOutcome::NotRun => ("not-run", None, None),
                };
                StageSummary {
                    stage: record.stage.to_string(),
                    outcome,
                    policy,
                    detail,
                }
            })
            .collect();

        let state = &report.state;
        Self {
            exit_code: report.exit_code(),
            total_time_ms: report.total_time.as_millis(),
            stages,
            image: state.image.as_ref().map(|i| i.to_string()),
            cluster: state.cluster.as_ref().map(|c| c.name.clone()),
            http_url: state.ports.as_ref().and_then(PortMap::http_url),
            https_url: state.ports.as_ref().and_then(PortMap::https_url),
            created: state
                .created
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            terraform: state.terraform.as_ref().map(|p| p.display().to_string()),
        }
    }
}

/// Output formatter for reports and port maps
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &PipelineReport) -> Result<String> {
        let summary = ReportSummary::from_report(report);
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&summary).context("Failed to serialize report")
            }
            OutputFormat::Human => Ok(Self::report_human(&summary)),
        }
    }

    pub fn format_ports(&self, ports: &PortMap) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(ports).context("Failed to serialize ports")
            }
            OutputFormat::Human => {
                let mut output = String::new();
                match (ports.http_url(), ports.https_url()) {
                    (None, None) => output.push_str("No ingress ports published\n"),
                    (http, https) => {
                        if let Some(url) = http {
                            output.push_str(&format!("HTTP:  {}\n", url));
                        }
                        if let Some(url) = https {
                            output.push_str(&format!("HTTPS: {}\n", url));
                        }
                    }
                }
                Ok(output)
            }
        }
    }

    fn report_human(summary: &ReportSummary) -> String {
        let mut output = String::new();
        output.push_str("Stages:\n");
        for stage in &summary.stages {
            output.push_str(&format!("  {:<12} {}", stage.stage, stage.outcome));
            if let Some(detail) = &stage.detail {
                output.push_str(&format!(" ({})", detail));
            }
            output.push('\n');
        }
        if let Some(image) = &summary.image {
            output.push_str(&format!("Image: {}\n", image));
        }
        output.push_str(&format!("Exit code: {}\n", summary.exit_code));
        output
    }
}
