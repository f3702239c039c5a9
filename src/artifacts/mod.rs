//! Generated project files
//!
//! - [`templates`]: embedded Dockerfile/manifest templates and their variables
//! - [`writer`]: write-once file creation

pub mod templates;
pub mod writer;

pub use templates::{TemplateRenderer, TemplateVars};
pub use writer::{ensure_artifact, ArtifactStatus};

use crate::context::BuildContext;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to render {template}: {message}")]
    Render { template: String, message: String },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file the pipeline generates, relative to the project directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub template: &'static str,
}

impl Artifact {
    fn new(path: impl Into<PathBuf>, template: &'static str) -> Self {
        Self {
            path: path.into(),
            template,
        }
    }
}

/// `Dockerfile` and `.dockerignore`
pub fn container_artifacts() -> Vec<Artifact> {
    vec![
        Artifact::new("Dockerfile", templates::DOCKERFILE),
        Artifact::new(".dockerignore", templates::DOCKERIGNORE),
    ]
}

/// The four Kubernetes manifests for `app_name` under `manifest_dir`
pub fn manifest_artifacts(manifest_dir: &Path, app_name: &str) -> Vec<Artifact> {
    [
        ("deployment", templates::DEPLOYMENT),
        ("service", templates::SERVICE),
        ("ingress", templates::INGRESS),
        ("hp-autoscaler", templates::HP_AUTOSCALER),
    ]
    .into_iter()
    .map(|(kind, template)| {
        Artifact::new(
            manifest_dir.join(format!("{}-{}.yaml", kind, app_name)),
            template,
        )
    })
    .collect()
}

/// Renders artifacts for one build context
pub struct Scaffolder {
    renderer: TemplateRenderer,
    vars: TemplateVars,
    project_dir: PathBuf,
}

impl Scaffolder {
    pub fn new(ctx: &BuildContext) -> Result<Self, ArtifactError> {
        Ok(Self {
            renderer: TemplateRenderer::from_embedded()?,
            vars: TemplateVars::from_context(ctx),
            project_dir: ctx.project_dir.clone(),
        })
    }

    pub fn ensure(&self, artifact: &Artifact) -> Result<ArtifactStatus, ArtifactError> {
        let path = self.project_dir.join(&artifact.path);
        ensure_artifact(&path, || self.renderer.render(artifact.template, &self.vars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ProjectSettings;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_layout() {
        let paths: Vec<PathBuf> = manifest_artifacts(Path::new("kubernetes"), "myapp")
            .into_iter()
            .map(|a| a.path)
            .collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("kubernetes/deployment-myapp.yaml"),
                PathBuf::from("kubernetes/service-myapp.yaml"),
                PathBuf::from("kubernetes/ingress-myapp.yaml"),
                PathBuf::from("kubernetes/hp-autoscaler-myapp.yaml"),
            ]
        );
    }

    #[test]
    fn test_scaffolder_writes_into_project() {
        let dir = TempDir::new().unwrap();
        let settings = ProjectSettings::defaults_for("myapp");
        let ctx = BuildContext::new(dir.path().to_path_buf(), &settings, "latest".into());
        let scaffolder = Scaffolder::new(&ctx).unwrap();

        for artifact in container_artifacts() {
            assert_eq!(scaffolder.ensure(&artifact).unwrap(), ArtifactStatus::Created);
        }
        for artifact in container_artifacts() {
            assert_eq!(
                scaffolder.ensure(&artifact).unwrap(),
                ArtifactStatus::AlreadyExists
            );
        }
        assert!(dir.path().join("Dockerfile").is_file());
        assert!(dir.path().join(".dockerignore").is_file());
    }
}
