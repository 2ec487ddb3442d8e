//! Stage 3: expand XML entities with an external tool.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use super::files::files_with_extension;
use crate::models::ResolverSettings;

/// Errors from resolving the entities of one file
#[derive(Error, Debug)]
pub enum EntityError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code:?} on {path}: {stderr}")]
    Failed {
        program: String,
        path: Utf8PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Expands the entity references of a file in place.
#[allow(async_fn_in_trait)]
pub trait EntityResolver {
    async fn resolve(&self, path: &Utf8Path) -> Result<(), EntityError>;
}

impl<R: EntityResolver> EntityResolver for &R {
    async fn resolve(&self, path: &Utf8Path) -> Result<(), EntityError> {
        (**self).resolve(path).await
    }
}

/// Runs an external command (`xmllint --noent` by default) that prints the
/// entity-expanded document on standard output.
///
/// The output goes to `<file>.temp` first and then replaces the original, so a
/// failed run leaves the file as it was.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandResolver {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_settings(settings: &ResolverSettings) -> Self {
        Self::new(
            settings.program.clone(),
            settings.args.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// Program and arguments for one file, for logging.
    pub fn command_line(&self, path: &Utf8Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(path.to_string());
        parts.join(" ")
    }
}

impl Default for CommandResolver {
    fn default() -> Self {
        Self::from_settings(&ResolverSettings::default())
    }
}

impl EntityResolver for CommandResolver {
    async fn resolve(&self, path: &Utf8Path) -> Result<(), EntityError> {
        tracing::debug!("Executing: {}", self.command_line(path));
        let start = Instant::now();

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EntityError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| EntityError::Timeout(self.timeout))?
            .map_err(|source| EntityError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(EntityError::Failed {
                program: self.program.clone(),
                path: path.to_path_buf(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let temp_path = Utf8PathBuf::from(format!("{}.temp", path));
        tokio::fs::write(&temp_path, &output.stdout)
            .await
            .map_err(|source| EntityError::Io {
                path: temp_path.clone(),
                source,
            })?;
        if let Err(source) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(EntityError::Io {
                path: path.to_path_buf(),
                source,
            });
        }

        tracing::debug!(
            "resolved entities in {} in {:.2}s",
            path,
            start.elapsed().as_secs_f32()
        );
        Ok(())
    }
}

/// Resolve every `.xml` file of `dir`, one at a time in file-name order.
///
/// Failures are logged and returned; they never stop the pass.
pub async fn resolve_directory<R: EntityResolver>(
    resolver: &R,
    dir: &Utf8Path,
) -> Result<Vec<Utf8PathBuf>> {
    let mut failed = Vec::new();

    for path in files_with_extension(dir, "xml")? {
        if let Err(e) = resolver.resolve(&path).await {
            tracing::warn!("running the entity resolver on {} failed: {}", path, e);
            failed.push(path);
        }
    }

    Ok(failed)
}
