//! In-process stand-ins for git, k3d and the Docker daemon
//!
//! The fakes keep just enough state to answer the way the real tools do:
//! k3d remembers which clusters exist and writes the kubeconfig it is asked
//! to merge, the runtime remembers running containers, built tags and every
//! exec. Tests assert on that state afterwards.

#![allow(dead_code)]

use async_trait::async_trait;
use gepp::config::GeppConfig;
use gepp::pipeline::{PipelineContext, ProjectPipeline};
use gepp::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};
use gepp::progress::{ProgressEvent, ProgressHandler};
use gepp::runtime::{ContainerRuntime, PortBindings, RunSpec, RuntimeError};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const COMMIT: &str = "abc12345deadbeef00112233445566778899aabb";
pub const SHORT_COMMIT: &str = "abc12345";
pub const HTTP_PORT: u16 = 38080;
pub const HTTPS_PORT: u16 = 38443;
pub const API_PORT: u16 = 41235;

/// Config that ignores the host environment
pub fn test_config() -> GeppConfig {
    GeppConfig {
        project_name: None,
        deploy_image: "gepp-kubectl:test".to_string(),
        k3d_bin: "k3d".to_string(),
        kubeconfig: PathBuf::from("kubeconfig"),
        manifest_dir: PathBuf::from("kubernetes"),
        command_timeout_secs: 30,
        log_level: "warn".to_string(),
    }
}

/// `<tmp>/<name>/` holding a one-line Python app and its requirements file
pub fn python_project(name: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let dir = tmp.path().join(name);
    fs::create_dir_all(&dir).expect("Failed to create project dir");
    fs::write(dir.join("main.py"), "print('hello')\n").expect("Failed to write main.py");
    fs::write(dir.join("requirements.txt"), "flask\n").expect("Failed to write requirements");
    (tmp, dir)
}

/// Kubeconfig as k3d writes it: the API server on a random host port
pub fn host_kubeconfig(cluster: &str) -> String {
    format!(
        "apiVersion: v1\n\
         kind: Config\n\
         clusters:\n\
         - cluster:\n    \
             certificate-authority-data: AAAA\n    \
             server: https://0.0.0.0:{port}\n  \
           name: k3d-{name}\n\
         contexts:\n\
         - context:\n    \
             cluster: k3d-{name}\n    \
             user: admin@k3d-{name}\n  \
           name: k3d-{name}\n\
         current-context: k3d-{name}\n",
        port = API_PORT,
        name = cluster
    )
}

/// Scripted `git` and `k3d`
#[derive(Default)]
pub struct FakeTools {
    pub clusters: Mutex<BTreeSet<String>>,
    pub calls: Mutex<Vec<Vec<String>>>,
    /// `git rev-parse` fails as outside a repository
    pub no_repo: bool,
    /// k3d subcommand (`create`, `merge`, `import`) that exits 1
    pub fail_on: Option<&'static str>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(subcommand: &'static str) -> Self {
        Self {
            fail_on: Some(subcommand),
            ..Self::default()
        }
    }

    /// k3d calls whose second word is `subcommand`
    pub fn count(&self, subcommand: &str) -> usize {
        self.k3d_calls()
            .iter()
            .filter(|call| call.get(2).map(String::as_str) == Some(subcommand))
            .count()
    }

    pub fn k3d_calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|args| args.first().map(String::as_str) == Some("k3d"))
            .cloned()
            .collect()
    }

    fn k3d(&self, args: &[String]) -> CommandOutput {
        let sub = args.get(1).map(String::as_str).unwrap_or_default();
        if self.fail_on == Some(sub) {
            return CommandOutput::new(Some(1), "", format!("FATA[0000] {} failed", sub));
        }

        match (args.first().map(String::as_str), sub) {
            (Some("cluster"), "list") => {
                let name = &args[2];
                if self.clusters.lock().unwrap().contains(name) {
                    CommandOutput::new(Some(0), format!("NAME SERVERS\n{} 1/1\n", name), "")
                } else {
                    CommandOutput::new(
                        Some(1),
                        "",
                        format!("FATA[0000] No nodes found for given cluster '{}'", name),
                    )
                }
            }
            (Some("cluster"), "create") => {
                let name = args.last().cloned().unwrap_or_default();
                self.clusters.lock().unwrap().insert(name.clone());
                // k3d logs progress on stderr even when it succeeds
                CommandOutput::new(
                    Some(0),
                    "",
                    format!("INFO[0000] Cluster '{}' created successfully!", name),
                )
            }
            (Some("kubeconfig"), "merge") => {
                let name = &args[2];
                let output = &args[4];
                fs::write(output, host_kubeconfig(name)).expect("Failed to write kubeconfig");
                CommandOutput::new(Some(0), output.clone(), "")
            }
            (Some("image"), "import") => {
                CommandOutput::new(Some(0), "", "INFO[0000] Successfully imported image(s)")
            }
            _ => CommandOutput::new(Some(1), "", format!("unknown command {:?}", args)),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeTools {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let mut call = vec![spec.program.clone()];
        call.extend(spec.args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        match spec.program.as_str() {
            "git" if self.no_repo => Ok(CommandOutput::new(
                Some(128),
                "",
                "fatal: not a git repository (or any of the parent directories): .git",
            )),
            "git" => Ok(CommandOutput::new(Some(0), format!("{}\n", COMMIT), "")),
            "k3d" => Ok(self.k3d(&spec.args)),
            other => Err(ProcessError::Spawn {
                program: other.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// An upload as the daemon received it
#[derive(Debug, Clone)]
pub struct Upload {
    pub container: String,
    pub path: String,
    pub entries: Vec<String>,
    pub kubeconfig: Option<String>,
}

/// In-memory Docker daemon
#[derive(Default)]
pub struct FakeDocker {
    pub built: Mutex<Vec<String>>,
    pub launched: Mutex<Vec<RunSpec>>,
    pub running: Mutex<BTreeSet<String>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub execs: Mutex<Vec<(String, Vec<String>)>>,
    pub removed: Mutex<Vec<String>>,
    pub load_balancers: HashMap<String, PortBindings>,
    /// First word of the exec command that exits 1 (`sed`, `kubectl`)
    pub fail_exec: Option<&'static str>,
    pub fail_build: bool,
}

impl FakeDocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes 80 and 443 for `k3d-<cluster>-serverlb`
    pub fn with_load_balancer(mut self, cluster: &str) -> Self {
        let mut bindings = PortBindings::new();
        bindings.insert("80/tcp".to_string(), vec![HTTP_PORT.to_string()]);
        bindings.insert("443/tcp".to_string(), vec![HTTPS_PORT.to_string()]);
        bindings.insert("6443/tcp".to_string(), vec![API_PORT.to_string()]);
        self.load_balancers
            .insert(format!("k3d-{}-serverlb", cluster), bindings);
        self
    }

    pub fn exec_commands(&self) -> Vec<Vec<String>> {
        self.execs
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cmd)| cmd.clone())
            .collect()
    }
}

fn archive_contents(archive: &[u8]) -> (Vec<String>, Option<String>) {
    let mut entries = Vec::new();
    let mut kubeconfig = None;
    let mut tar = tar::Archive::new(archive);
    for entry in tar.entries().expect("Invalid archive") {
        let mut entry = entry.expect("Invalid archive entry");
        let path = entry.path().expect("Invalid path").display().to_string();
        if path == "kubeconfig" {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .expect("Unreadable kubeconfig");
            kubeconfig = Some(content);
        }
        entries.push(path);
    }
    (entries, kubeconfig)
}

#[async_trait]
impl ContainerRuntime for FakeDocker {
    async fn version(&self) -> Result<String, RuntimeError> {
        Ok("24.0.7".to_string())
    }

    async fn build_image(&self, context: Vec<u8>, tag: &str) -> Result<(), RuntimeError> {
        let (entries, _) = archive_contents(&context);
        if !entries.iter().any(|e| e == "Dockerfile") {
            return Err(RuntimeError::Build("Cannot locate specified Dockerfile".to_string()));
        }
        if self.fail_build {
            return Err(RuntimeError::Build(
                "The command '/bin/sh -c pip install -r requirements.txt' returned a non-zero code: 1"
                    .to_string(),
            ));
        }
        self.built.lock().unwrap().push(tag.to_string());
        Ok(())
    }

    async fn port_bindings(&self, container: &str) -> Result<PortBindings, RuntimeError> {
        self.load_balancers
            .get(container)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(format!("No such container: {}", container)))
    }

    async fn run_detached(&self, spec: &RunSpec) -> Result<String, RuntimeError> {
        self.launched.lock().unwrap().push(spec.clone());
        self.running.lock().unwrap().insert(spec.name.clone());
        Ok(spec.name.clone())
    }

    async fn upload_archive(
        &self,
        container: &str,
        path: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        if !self.running.lock().unwrap().contains(container) {
            return Err(RuntimeError::NotFound(container.to_string()));
        }
        let (entries, kubeconfig) = archive_contents(&archive);
        self.uploads.lock().unwrap().push(Upload {
            container: container.to_string(),
            path: path.to_string(),
            entries,
            kubeconfig,
        });
        Ok(())
    }

    async fn exec(&self, container: &str, cmd: &[String]) -> Result<CommandOutput, RuntimeError> {
        if !self.running.lock().unwrap().contains(container) {
            return Err(RuntimeError::NotFound(container.to_string()));
        }
        self.execs
            .lock()
            .unwrap()
            .push((container.to_string(), cmd.to_vec()));

        let program = cmd.first().map(String::as_str).unwrap_or_default();
        if self.fail_exec == Some(program) {
            return Ok(CommandOutput::new(
                Some(1),
                "",
                "error: unable to recognize \"/kubernetes/ingress.yaml\"",
            ));
        }
        let stdout = if program == "kubectl" {
            "deployment.apps/myapp created\nservice/myapp created\n"
        } else {
            ""
        };
        Ok(CommandOutput::new(Some(0), stdout, ""))
    }

    async fn remove(&self, container: &str) -> Result<(), RuntimeError> {
        if !self.running.lock().unwrap().remove(container) {
            return Err(RuntimeError::NotFound(container.to_string()));
        }
        self.removed.lock().unwrap().push(container.to_string());
        Ok(())
    }
}

/// Keeps every event in order
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// A pipeline wired to the fakes, keeping handles to inspect them
pub struct Harness {
    pub tools: Arc<FakeTools>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub events: Arc<RecordingHandler>,
    pub pipeline: ProjectPipeline,
}

impl Harness {
    pub fn new(tools: Arc<FakeTools>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let events = Arc::new(RecordingHandler::default());
        let pipeline = ProjectPipeline::new(PipelineContext::new(
            test_config(),
            tools.clone(),
            runtime.clone(),
            events.clone(),
        ));
        Self {
            tools,
            runtime,
            events,
            pipeline,
        }
    }
}

pub fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.as_ref().display(), e))
}
