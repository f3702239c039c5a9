//! Write-once file creation
//!
//! Generated files are starting points the user is expected to edit, so an
//! existing file is never touched: not re-rendered, not truncated, not
//! compared.

use super::ArtifactError;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    Created,
    AlreadyExists,
}

/// Writes the output of `render` to `path` unless `path` already exists.
///
/// `render` is only invoked when the file is absent. Parent directories are
/// created as needed. The final open uses `create_new`, so a file appearing
/// between the check and the write is still left alone.
pub fn ensure_artifact<F>(path: &Path, render: F) -> Result<ArtifactStatus, ArtifactError>
where
    F: FnOnce() -> Result<String, ArtifactError>,
{
    if path.exists() {
        return Ok(ArtifactStatus::AlreadyExists);
    }

    let content = render()?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Ok(ArtifactStatus::AlreadyExists)
        }
        Err(source) => {
            return Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    file.write_all(content.as_bytes())
        .map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(ArtifactStatus::Created)
}
