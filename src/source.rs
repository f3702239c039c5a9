//! Configuration sources
//!
//! A [`ConfigSource`] turns the project name into the project
//! settings the build context is computed from. [`DefaultConfig`] answers
//! every question with the stock values; [`InteractiveConfig`] asks on a
//! terminal and falls back to the stock value for an empty answer.

use crate::config::ConfigError;
use crate::context::slugify;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// A port the application listens on, as rendered into the manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSpec {
    pub name: String,
    pub protocol: String,
    pub port: u16,
}

impl PortSpec {
    pub fn tcp(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            protocol: "TCP".to_string(),
            port,
        }
    }
}

/// Per-project answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    pub app_name: String,
    pub app_port: u16,
    pub base_image: String,
    pub dependency_file: PathBuf,
    pub main_file: PathBuf,
    pub code_dir: PathBuf,
    pub image_work_dir: String,
    pub user_id: u32,
    /// Listening ports besides the main HTTP port
    pub extra_ports: Vec<PortSpec>,
    pub dns_name: String,
    pub registry_org: Option<String>,
}

impl ProjectSettings {
    pub fn defaults_for(project_name: &str) -> Self {
        Self {
            app_name: slugify(project_name),
            app_port: 80,
            base_image: "python:3-alpine3.12".to_string(),
            dependency_file: PathBuf::from("requirements.txt"),
            main_file: PathBuf::from("main.py"),
            code_dir: PathBuf::from("."),
            image_work_dir: "/code".to_string(),
            user_id: 0,
            extra_ports: vec![PortSpec::tcp("api", 8080)],
            dns_name: "localhost".to_string(),
            registry_org: None,
        }
    }
}

/// Produces project settings for the pipeline
pub trait ConfigSource {
    fn load(&mut self, project_name: &str) -> Result<ProjectSettings, ConfigError>;
}

/// Stock settings, no questions asked
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConfig;

impl ConfigSource for DefaultConfig {
    fn load(&mut self, project_name: &str) -> Result<ProjectSettings, ConfigError> {
        Ok(ProjectSettings::defaults_for(project_name))
    }
}

/// Prompts for the most commonly changed settings
pub struct InteractiveConfig<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InteractiveConfig<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str, default: &str) -> Result<String, ConfigError> {
        write!(self.output, "{} [{}]: ", question, default)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let answer = line.trim();

        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer.to_string()
        })
    }

    /// Asks until the answer is a port in 1..=65535. An empty answer (or
    /// end of input) takes the default.
    fn ask_port(&mut self, question: &str, default: u16) -> Result<u16, ConfigError> {
        loop {
            let answer = self.ask(question, &default.to_string())?;
            match answer.parse::<u16>() {
                Ok(port) if port != 0 => return Ok(port),
                _ => writeln!(self.output, "'{}' is not a valid port", answer)?,
            }
        }
    }
}

impl InteractiveConfig<std::io::StdinLock<'static>, std::io::Stderr> {
    /// Reads answers from stdin and writes prompts to stderr, keeping stdout
    /// for status lines and reports.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> ConfigSource for InteractiveConfig<R, W> {
    fn load(&mut self, project_name: &str) -> Result<ProjectSettings, ConfigError> {
        let mut settings = ProjectSettings::defaults_for(project_name);

        let name = self.ask("Application name", &settings.app_name)?;
        settings.app_name = slugify(&name);

        settings.app_port = self.ask_port("Port the app listens on", settings.app_port)?;

        let main_file = self.ask("Main file", &settings.main_file.display().to_string())?;
        settings.main_file = PathBuf::from(main_file);

        let dependency_file = self.ask(
            "Dependency file",
            &settings.dependency_file.display().to_string(),
        )?;
        settings.dependency_file = PathBuf::from(dependency_file);

        settings.base_image = self.ask("Base image", &settings.base_image)?;

        let org = self.ask("Registry organisation (- for none)", "-")?;
        settings.registry_org = if org == "-" { None } else { Some(org) };

        Ok(settings)
    }
}
