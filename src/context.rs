//! Immutable values threaded through the pipeline
//!
//! [`BuildContext`] is computed once before the first stage runs and is only
//! ever borrowed afterwards. The remaining types are produced by one stage and
//! consumed by a later one.

use crate::process::{CommandRunner, CommandSpec};
use crate::source::{PortSpec, ProjectSettings};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tag used when the project has no resolvable commit
pub const FALLBACK_TAG: &str = "latest";

/// API port of the k3s server behind the cluster load balancer
pub const CLUSTER_API_PORT: u16 = 6443;

const COMMIT_TAG_LEN: usize = 8;

/// Transliterate to ASCII, lowercase, collapse every run of
/// non-alphanumerics into a single `-` and trim dashes from both ends.
pub fn slugify(input: &str) -> String {
    let ascii = deunicode::deunicode(input);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

/// Short hash of `HEAD`, or [`FALLBACK_TAG`] when git is missing, the
/// directory is not a repository, or there are no commits yet.
pub async fn resolve_commit(runner: &dyn CommandRunner, project_dir: &Path) -> String {
    let spec = CommandSpec::new("git", ["rev-parse", "HEAD"]).current_dir(project_dir);

    match runner.run(&spec).await {
        Ok(output) if output.success() => {
            let hash = output.stdout.trim();
            if hash.is_empty() {
                FALLBACK_TAG.to_string()
            } else {
                hash.chars().take(COMMIT_TAG_LEN).collect()
            }
        }
        Ok(output) => {
            debug!(stderr = %output.diagnostics(), "No commit resolvable");
            FALLBACK_TAG.to_string()
        }
        Err(e) => {
            debug!(error = %e, "git unavailable");
            FALLBACK_TAG.to_string()
        }
    }
}

/// Everything the build and template stages need to know about the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Absolute project root; all relative paths below resolve against it
    pub project_dir: PathBuf,
    /// Slugified project name
    pub app_name: String,
    /// Basename of the project directory
    pub base_dir: String,
    /// Short commit hash or `latest`
    pub commit: String,
    pub source_dir: PathBuf,
    pub dependency_manifest: PathBuf,
    pub base_image: String,
    pub work_dir: String,
    pub run_as_uid: u32,
    pub main_entrypoint: PathBuf,
    pub app_port: u16,
    pub ports: Vec<PortSpec>,
    pub dns_name: String,
    pub registry_org: Option<String>,
}

impl BuildContext {
    pub fn new(project_dir: PathBuf, settings: &ProjectSettings, commit: String) -> Self {
        let base_dir = project_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        let mut ports = vec![PortSpec::tcp("http", settings.app_port)];
        ports.extend(settings.extra_ports.iter().cloned());

        Self {
            project_dir,
            app_name: settings.app_name.clone(),
            base_dir,
            commit,
            source_dir: settings.code_dir.clone(),
            dependency_manifest: settings.dependency_file.clone(),
            base_image: settings.base_image.clone(),
            work_dir: settings.image_work_dir.clone(),
            run_as_uid: settings.user_id,
            main_entrypoint: settings.main_file.clone(),
            app_port: settings.app_port,
            ports,
            dns_name: settings.dns_name.clone(),
            registry_org: settings.registry_org.clone(),
        }
    }

    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.project_dir.join(relative)
    }

    /// Build context directory on the host
    pub fn source_path(&self) -> PathBuf {
        self.resolve(&self.source_dir)
    }

    pub fn entrypoint_path(&self) -> PathBuf {
        self.resolve(&self.main_entrypoint)
    }

    /// The reference the image build will be tagged with
    pub fn image_reference(&self) -> ImageReference {
        ImageReference {
            registry_org: self.registry_org.clone(),
            repo_name: self.app_name.clone(),
            tag: self.commit.clone(),
        }
    }
}

/// `[org/]repo:tag`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    pub registry_org: Option<String>,
    pub repo_name: String,
    pub tag: String,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.registry_org.as_deref() {
            Some(org) if !org.is_empty() => write!(f, "{}/{}:{}", org, self.repo_name, self.tag),
            _ => write!(f, "{}:{}", self.repo_name, self.tag),
        }
    }
}

/// A named k3d cluster and the host-side kubeconfig pointing at it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    pub name: String,
    pub load_balancer_container: String,
    pub kubeconfig_path: PathBuf,
}

impl ClusterHandle {
    pub fn new(name: impl Into<String>, kubeconfig_path: PathBuf) -> Self {
        let name = name.into();
        Self {
            load_balancer_container: format!("k3d-{}-serverlb", name),
            name,
            kubeconfig_path,
        }
    }

    /// Docker network k3d attaches every node of the cluster to
    pub fn network(&self) -> String {
        format!("k3d-{}", self.name)
    }

    /// API server address as seen from inside the cluster network
    pub fn internal_api_endpoint(&self) -> String {
        format!(
            "https://{}:{}",
            self.load_balancer_container, CLUSTER_API_PORT
        )
    }
}

/// Container port (without protocol suffix) to published host port
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortMap(BTreeMap<String, u16>);

impl PortMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, container_port: impl Into<String>, host_port: u16) {
        self.0.insert(container_port.into(), host_port);
    }

    pub fn get(&self, container_port: &str) -> Option<u16> {
        self.0.get(container_port).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn http_url(&self) -> Option<String> {
        self.get("80").map(|p| format!("http://localhost:{}", p))
    }

    pub fn https_url(&self) -> Option<String> {
        self.get("443").map(|p| format!("https://localhost:{}", p))
    }
}

/// One run of the ephemeral deploy executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployJob {
    /// Name given to the ephemeral container
    pub id: String,
    pub cluster: ClusterHandle,
    pub manifest_dir: PathBuf,
    pub kubeconfig_path: PathBuf,
}

impl DeployJob {
    pub fn new(cluster: ClusterHandle, manifest_dir: PathBuf) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("gepp-deploy-{}-{}", cluster.name, &suffix[..8]),
            kubeconfig_path: cluster.kubeconfig_path.clone(),
            cluster,
            manifest_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, ProcessError};
    use async_trait::async_trait;

    struct FixedRunner(Result<CommandOutput, ()>);

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
            assert_eq!(spec.program, "git");
            self.0.clone().map_err(|_| ProcessError::Spawn {
                program: "git".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My App"), "my-app");
        assert_eq!(slugify("  Hello,  World!! "), "hello-world");
        assert_eq!(slugify("already-slugged"), "already-slugged");
        assert_eq!(slugify("UPPER_case.v2"), "upper-case-v2");
        assert_eq!(slugify("---"), "project");
        assert_eq!(slugify(""), "project");
    }

    #[test]
    fn test_slugify_transliterates_non_ascii() {
        assert_eq!(slugify("Café Münster"), "cafe-munster");
        assert_eq!(slugify("Ünïcödé"), "unicode");
        assert_eq!(slugify("Straße 5"), "strasse-5");
    }

    #[tokio::test]
    async fn test_resolve_commit_truncates() {
        let runner = FixedRunner(Ok(CommandOutput::new(
            Some(0),
            "0123456789abcdef0123456789abcdef01234567\n",
            "",
        )));
        assert_eq!(resolve_commit(&runner, Path::new(".")).await, "01234567");
    }

    #[tokio::test]
    async fn test_resolve_commit_fallbacks() {
        let not_a_repo = FixedRunner(Ok(CommandOutput::new(
            Some(128),
            "",
            "fatal: not a git repository",
        )));
        assert_eq!(resolve_commit(&not_a_repo, Path::new(".")).await, "latest");

        let no_git = FixedRunner(Err(()));
        assert_eq!(resolve_commit(&no_git, Path::new(".")).await, "latest");
    }

    #[test]
    fn test_image_reference_display() {
        let mut reference = ImageReference {
            registry_org: None,
            repo_name: "myapp".to_string(),
            tag: "abc12345".to_string(),
        };
        assert_eq!(reference.to_string(), "myapp:abc12345");

        reference.registry_org = Some("acme".to_string());
        assert_eq!(reference.to_string(), "acme/myapp:abc12345");
    }

    #[test]
    fn test_cluster_handle_names() {
        let handle = ClusterHandle::new("myapp", PathBuf::from("/tmp/myapp/kubeconfig"));
        assert_eq!(handle.load_balancer_container, "k3d-myapp-serverlb");
        assert_eq!(handle.network(), "k3d-myapp");
        assert_eq!(
            handle.internal_api_endpoint(),
            "https://k3d-myapp-serverlb:6443"
        );
    }

    #[test]
    fn test_port_map_urls() {
        let mut ports = PortMap::new();
        assert!(ports.http_url().is_none());

        ports.insert("80", 38080);
        ports.insert("443", 38443);
        assert_eq!(ports.http_url().as_deref(), Some("http://localhost:38080"));
        assert_eq!(ports.https_url().as_deref(), Some("https://localhost:38443"));
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_build_context_from_settings() {
        let settings = ProjectSettings::defaults_for("My App");
        let ctx = BuildContext::new(PathBuf::from("/work/myapp"), &settings, "latest".into());

        assert_eq!(ctx.app_name, "my-app");
        assert_eq!(ctx.base_dir, "myapp");
        assert_eq!(ctx.entrypoint_path(), PathBuf::from("/work/myapp/main.py"));
        assert_eq!(ctx.ports[0], PortSpec::tcp("http", 80));
        assert_eq!(ctx.image_reference().to_string(), "my-app:latest");
    }

    #[test]
    fn test_deploy_job_ids_are_unique() {
        let handle = ClusterHandle::new("myapp", PathBuf::from("kubeconfig"));
        let a = DeployJob::new(handle.clone(), PathBuf::from("kubernetes"));
        let b = DeployJob::new(handle, PathBuf::from("kubernetes"));
        assert!(a.id.starts_with("gepp-deploy-myapp-"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.kubeconfig_path, PathBuf::from("kubeconfig"));
    }
}
