//! Version-control collaborator

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::error::ExecError;
use crate::process::{ProcessOutput, ProcessRunner};

/// Failure signature git prints when the remote drops the connection;
/// the one sync failure treated as transient.
pub const REMOTE_HANGUP: &str = "The remote end hung up unexpectedly";

/// Version-control errors
#[derive(Error, Debug)]
pub enum VcsError {
    /// A git command exited non-zero
    #[error("git {operation} failed in {path}: {detail}")]
    CommandFailed {
        operation: String,
        path: PathBuf,
        detail: String,
    },

    /// The git executable could not be run at all
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl VcsError {
    /// Whether this failure matches the recognized transient signature
    pub fn is_transient(&self) -> bool {
        match self {
            Self::CommandFailed { detail, .. } => detail.contains(REMOTE_HANGUP),
            Self::Exec(_) => false,
        }
    }
}

/// Result type alias for version-control operations
pub type Result<T> = std::result::Result<T, VcsError>;

/// Version-control operations the pipelines depend on
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Fast-forward pull of whatever the checkout currently tracks
    async fn pull_latest(&self, path: &Path) -> Result<()>;

    /// Clone `repo_url` into `dest` under `root`
    async fn clone_repo(&self, root: &Path, dest: &str, repo_url: &str) -> Result<()>;

    /// Discard local modifications under `path`
    async fn discard_local_changes(&self, path: &Path) -> Result<()>;

    /// Fast-forward pull of the currently checked-out branch from origin
    async fn pull_current_branch(&self, path: &Path) -> Result<()>;
}

/// `VcsClient` backed by the git command-line client
#[derive(Debug, Clone)]
pub struct GitCli {
    runner: ProcessRunner,
}

impl GitCli {
    /// Create a git client over a process runner
    pub fn new(runner: ProcessRunner) -> Self {
        Self { runner }
    }

    async fn git(&self, dir: &Path, operation: &str, args: &[&str]) -> Result<ProcessOutput> {
        let output = self.runner.run(dir, "git", args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(VcsError::CommandFailed {
                operation: operation.to_string(),
                path: dir.to_path_buf(),
                detail: combine_streams(&output),
            })
        }
    }
}

#[async_trait]
impl VcsClient for GitCli {
    async fn pull_latest(&self, path: &Path) -> Result<()> {
        self.git(path, "pull", &["pull", "--ff-only"]).await?;
        Ok(())
    }

    async fn clone_repo(&self, root: &Path, dest: &str, repo_url: &str) -> Result<()> {
        self.git(root, "clone", &["clone", repo_url, dest]).await?;
        Ok(())
    }

    async fn discard_local_changes(&self, path: &Path) -> Result<()> {
        debug!("Discarding local changes under {}", path.display());
        self.git(path, "checkout", &["checkout", "--", "."]).await?;
        Ok(())
    }

    async fn pull_current_branch(&self, path: &Path) -> Result<()> {
        let head = self
            .git(path, "rev-parse", &["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        let branch = head.stdout.trim().to_string();
        self.git(path, "pull", &["pull", "--ff-only", "origin", &branch])
            .await?;
        Ok(())
    }
}

fn combine_streams(output: &ProcessOutput) -> String {
    let mut detail = output.stderr.trim().to_string();
    if detail.is_empty() {
        detail = output.stdout.trim().to_string();
    } else if !output.stdout.trim().is_empty() {
        detail.push('\n');
        detail.push_str(output.stdout.trim());
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_failed(detail: &str) -> VcsError {
        VcsError::CommandFailed {
            operation: "pull".to_string(),
            path: PathBuf::from("/ws/app"),
            detail: detail.to_string(),
        }
    }

    #[test]
    fn remote_hangup_is_transient() {
        let err = command_failed("fatal: The remote end hung up unexpectedly\nfetch failed");
        assert!(err.is_transient());
    }

    #[test]
    fn other_failures_are_not_transient() {
        let err = command_failed("fatal: Not possible to fast-forward, aborting.");
        assert!(!err.is_transient());
    }

    #[test]
    fn error_names_operation_and_path() {
        let err = command_failed("boom");
        let text = err.to_string();
        assert!(text.contains("pull"));
        assert!(text.contains("/ws/app"));
    }
}
