//! Embedded templates for the Dockerfile and Kubernetes manifests
//!
//! Templates are compiled into the binary with `include_str!` and rendered
//! with Tera against a fixed variable set, [`TemplateVars`].

use super::ArtifactError;
use crate::context::BuildContext;
use crate::source::PortSpec;
use serde::Serialize;
use std::collections::BTreeMap;
use tera::{Context, Tera};
use tracing::debug;

pub const DOCKERFILE: &str = "Dockerfile.j2";
pub const DOCKERIGNORE: &str = "dockerignore.j2";
pub const DEPLOYMENT: &str = "deployment.yaml.j2";
pub const SERVICE: &str = "service.yaml.j2";
pub const INGRESS: &str = "ingress.yaml.j2";
pub const HP_AUTOSCALER: &str = "hp-autoscaler.yaml.j2";

const ALL_TEMPLATES: &[(&str, &str)] = &[
    (DOCKERFILE, include_str!("templates/Dockerfile.j2")),
    (DOCKERIGNORE, include_str!("templates/dockerignore.j2")),
    (DEPLOYMENT, include_str!("templates/deployment.yaml.j2")),
    (SERVICE, include_str!("templates/service.yaml.j2")),
    (INGRESS, include_str!("templates/ingress.yaml.j2")),
    (HP_AUTOSCALER, include_str!("templates/hp-autoscaler.yaml.j2")),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAmount {
    pub cpu: String,
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceConstraints {
    pub requests: ResourceAmount,
    pub limits: ResourceAmount,
}

impl Default for ResourceConstraints {
    fn default() -> Self {
        Self {
            requests: ResourceAmount {
                cpu: "10m".to_string(),
                memory: "50Mi".to_string(),
            },
            limits: ResourceAmount {
                cpu: "100m".to_string(),
                memory: "500Mi".to_string(),
            },
        }
    }
}

/// Secret mounted read-only into the application container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretMount {
    pub name: String,
    pub key: String,
    pub path: String,
}

/// The fixed variable set every template renders against
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVars {
    pub app_object: String,
    pub app_name: String,
    pub main_file: String,
    pub app_port: u16,
    pub code_dir: String,
    pub dependency_file: String,
    pub base_image: String,
    pub current_commit: String,
    pub base_dir: String,
    pub image_work_dir: String,
    #[serde(rename = "userID")]
    pub user_id: u32,
    pub ports: Vec<PortSpec>,
    pub dns_name: String,
    pub image_name: String,
    pub resources: ResourceConstraints,
    pub environment: BTreeMap<String, String>,
    pub secrets: Vec<SecretMount>,
}

impl TemplateVars {
    pub fn from_context(ctx: &BuildContext) -> Self {
        let mut environment = BTreeMap::new();
        environment.insert("PYTHON_DEBUG".to_string(), "0".to_string());

        Self {
            app_object: "app".to_string(),
            app_name: ctx.app_name.clone(),
            main_file: ctx.main_entrypoint.display().to_string(),
            app_port: ctx.app_port,
            code_dir: ctx.source_dir.display().to_string(),
            dependency_file: ctx.dependency_manifest.display().to_string(),
            base_image: ctx.base_image.clone(),
            current_commit: ctx.commit.clone(),
            base_dir: ctx.base_dir.clone(),
            image_work_dir: ctx.work_dir.clone(),
            user_id: ctx.run_as_uid,
            ports: ctx.ports.clone(),
            dns_name: ctx.dns_name.clone(),
            image_name: ctx.image_reference().to_string(),
            resources: ResourceConstraints::default(),
            environment,
            secrets: vec![SecretMount {
                name: "prod-jwt-token".to_string(),
                key: "secret".to_string(),
                path: "/secrets/jwt".to_string(),
            }],
        }
    }
}

pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    pub fn from_embedded() -> Result<Self, ArtifactError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(ALL_TEMPLATES.iter().copied())
            .map_err(|e| ArtifactError::Render {
                template: "(embedded)".to_string(),
                message: render_chain(&e),
            })?;
        debug!(count = ALL_TEMPLATES.len(), "Loaded embedded templates");
        Ok(Self { tera })
    }

    /// Renders `template`; the result always ends with a newline
    pub fn render(&self, template: &str, vars: &TemplateVars) -> Result<String, ArtifactError> {
        let context = Context::from_serialize(vars).map_err(|e| ArtifactError::Render {
            template: template.to_string(),
            message: render_chain(&e),
        })?;

        let mut rendered =
            self.tera
                .render(template, &context)
                .map_err(|e| ArtifactError::Render {
                    template: template.to_string(),
                    message: render_chain(&e),
                })?;

        if !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        Ok(rendered)
    }
}

/// Tera hides the useful part of an error in its source chain
fn render_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
