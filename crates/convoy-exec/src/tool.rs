//! Build-tool and SQL-execution collaborators

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ExecError;
use crate::process::ProcessRunner;

/// Tool invocation errors
#[derive(Error, Debug)]
pub enum ToolError {
    /// A SQL script exited non-zero
    #[error("SQL script {script} failed: {detail}")]
    ScriptFailed { script: PathBuf, detail: String },

    /// The tool could not be run at all
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Result type alias for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

/// Build-tool collaborator.
///
/// The exit code is data, not an error: the build pipeline decides what a
/// non-zero build means for the run.
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Build the module rooted at `build_path`, returning the tool's exit code
    async fn build(&self, root: &Path, build_path: &Path) -> Result<i32>;
}

/// SQL-execution collaborator
#[async_trait]
pub trait SqlRunner: Send + Sync {
    /// Execute one script file against the database of `project_path`
    async fn run_script(&self, project_path: &Path, script: &Path) -> Result<()>;
}

/// `BuildTool` invoking a configured command with the build path appended
#[derive(Debug, Clone)]
pub struct CommandBuildTool {
    runner: ProcessRunner,
    program: String,
    args: Vec<String>,
}

impl CommandBuildTool {
    pub fn new(runner: ProcessRunner, program: impl Into<String>, args: Vec<String>) -> Self {
        Self { runner, program: program.into(), args }
    }
}

#[async_trait]
impl BuildTool for CommandBuildTool {
    async fn build(&self, root: &Path, build_path: &Path) -> Result<i32> {
        let build_path = build_path.display().to_string();
        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.push(&build_path);

        let output = self.runner.run(root, &self.program, &args).await?;
        Ok(output.exit_code)
    }
}

/// `SqlRunner` invoking a configured command with the script path appended
#[derive(Debug, Clone)]
pub struct CommandSqlRunner {
    runner: ProcessRunner,
    program: String,
    args: Vec<String>,
}

impl CommandSqlRunner {
    pub fn new(runner: ProcessRunner, program: impl Into<String>, args: Vec<String>) -> Self {
        Self { runner, program: program.into(), args }
    }
}

#[async_trait]
impl SqlRunner for CommandSqlRunner {
    async fn run_script(&self, project_path: &Path, script: &Path) -> Result<()> {
        let script_arg = script.display().to_string();
        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.push(&script_arg);

        let output = self.runner.run(project_path, &self.program, &args).await?;
        if output.success() {
            Ok(())
        } else {
            Err(ToolError::ScriptFailed {
                script: script.to_path_buf(),
                detail: if output.stderr.trim().is_empty() {
                    format!("exit code {}", output.exit_code)
                } else {
                    output.stderr.trim().to_string()
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn runner() -> ProcessRunner {
        ProcessRunner::new(Duration::from_secs(30), Duration::from_secs(120))
    }

    #[tokio::test]
    async fn build_returns_exit_code_as_data() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CommandBuildTool::new(runner(), "sh", vec!["-c".into(), "exit 2 #".into()]);

        let code = tool.build(dir.path(), Path::new("Build")).await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn sql_runner_fails_on_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let sql = CommandSqlRunner::new(runner(), "sh", vec!["-c".into(), "exit 1 #".into()]);

        let err = sql
            .run_script(dir.path(), Path::new("schema.sql"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ScriptFailed { .. }));
    }

    #[tokio::test]
    async fn sql_runner_succeeds_on_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let sql = CommandSqlRunner::new(runner(), "true", vec![]);

        sql.run_script(dir.path(), Path::new("schema.sql")).await.unwrap();
    }
}
