//! Image Builder
//!
//! Builds the project image through the container runtime. A missing or
//! stopped daemon is common on developer machines, so it only skips the
//! phase; a failing build is reported and the pipeline carries on without
//! an image.

use crate::context::{BuildContext, ImageReference};
use crate::runtime::ContainerRuntime;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const DOCKERFILE: &str = "Dockerfile";
const DOCKERIGNORE: &str = ".dockerignore";

#[derive(Debug, Error)]
pub enum PackError {
    #[error("Failed to walk build context: {0}")]
    Walk(#[from] ignore::Error),

    #[error("Failed to archive {path}: {source}")]
    Archive {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built {
        reference: ImageReference,
        engine_version: String,
    },
    /// Runtime unreachable; nothing was attempted
    Skipped { reason: String },
    Failed { reference: ImageReference, error: String },
}

impl BuildOutcome {
    /// The image downstream stages may use
    pub fn image(&self) -> Option<&ImageReference> {
        match self {
            BuildOutcome::Built { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

/// Matcher for the `.dockerignore` at the root of `source_dir`.
///
/// Docker reads only the root file and matches every pattern against the
/// path relative to the context root, so `build` excludes `./build` but not
/// `app/build`. Each pattern is anchored with a leading `/` to get the same
/// behavior out of gitignore matching.
pub fn dockerignore_matcher(source_dir: &Path) -> Result<Gitignore, PackError> {
    let mut builder = GitignoreBuilder::new(source_dir);
    let path = source_dir.join(DOCKERIGNORE);

    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(builder.build()?),
        Err(source) => {
            return Err(PackError::Archive {
                path: path.display().to_string(),
                source,
            })
        }
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (negate, pattern) = match line.strip_prefix('!') {
            Some(rest) => ("!", rest.trim()),
            None => ("", line),
        };
        let pattern = pattern.trim_start_matches("./").trim_matches('/');
        if pattern.is_empty() {
            continue;
        }
        builder.add_line(Some(path.clone()), &format!("{}/{}", negate, pattern))?;
    }

    Ok(builder.build()?)
}

/// Packs `source_dir` into an uncompressed tar, skipping whatever
/// `.dockerignore` excludes. The Dockerfile at `dockerfile` is always placed
/// at the archive root, even when `.dockerignore` lists it.
pub fn pack_build_context(source_dir: &Path, dockerfile: &Path) -> Result<Vec<u8>, PackError> {
    let dockerignore = dockerignore_matcher(source_dir)?;
    let mut builder = tar::Builder::new(Vec::new());
    builder.mode(tar::HeaderMode::Deterministic);

    let walker = WalkBuilder::new(source_dir)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = 0usize;
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let relative = match entry.path().strip_prefix(source_dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if relative == Path::new(DOCKERFILE)
            || dockerignore
                .matched_path_or_any_parents(relative, false)
                .is_ignore()
        {
            continue;
        }

        builder
            .append_path_with_name(entry.path(), relative)
            .map_err(|source| PackError::Archive {
                path: relative.display().to_string(),
                source,
            })?;
        files += 1;
    }

    builder
        .append_path_with_name(dockerfile, DOCKERFILE)
        .map_err(|source| PackError::Archive {
            path: dockerfile.display().to_string(),
            source,
        })?;

    debug!(files = files + 1, "Packed build context");

    builder.into_inner().map_err(|source| PackError::Archive {
        path: source_dir.display().to_string(),
        source,
    })
}

pub struct ImageBuilder {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ImageBuilder {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub async fn build(&self, ctx: &BuildContext, reference: &ImageReference) -> BuildOutcome {
        let engine_version = match self.runtime.version().await {
            Ok(v) => v,
            Err(e) => {
                info!(error = %e, "Skipping image build");
                return BuildOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let context = match pack_build_context(&ctx.source_path(), &ctx.resolve(DOCKERFILE)) {
            Ok(tar) => tar,
            Err(e) => {
                warn!(error = %e, "Could not pack build context");
                return BuildOutcome::Failed {
                    reference: reference.clone(),
                    error: e.to_string(),
                };
            }
        };

        let tag = reference.to_string();
        info!(tag = %tag, bytes = context.len(), "Building image");

        match self.runtime.build_image(context, &tag).await {
            Ok(()) => BuildOutcome::Built {
                reference: reference.clone(),
                engine_version,
            },
            Err(e) => {
                warn!(tag = %tag, error = %e, "Image build failed");
                BuildOutcome::Failed {
                    reference: reference.clone(),
                    error: e.to_string(),
                }
            }
        }
    }
}
