//! Error types for the orchestration module

use convoy_core::CoreError;
use convoy_exec::VcsError;
use thiserror::Error;

/// Orchestration error types.
///
/// Sync failures are run-fatal; per-module build failures are recorded in
/// the run context instead of surfacing here.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A sync failure that does not match the transient signature
    #[error("Synchronization of module {module} failed: {source}")]
    FatalSync {
        module: String,
        #[source]
        source: VcsError,
    },

    /// The transient retry budget ran out
    #[error("Synchronization of module {module} still failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        module: String,
        attempts: u32,
        #[source]
        source: VcsError,
    },

    /// The sync pipeline stopped before this module's signal was set
    #[error("Sync pipeline aborted before module {module} became ready")]
    SyncAborted { module: String },

    /// Remediation after an unknown-module error failed itself
    #[error("Remediation of module {module} failed: {source}")]
    Remediation {
        module: String,
        #[source]
        source: VcsError,
    },

    /// A pipeline task panicked
    #[error("{pipeline} pipeline task failed: {message}")]
    Task { pipeline: String, message: String },

    /// Registry, graph or ordering error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Create a task-failure error
    pub fn task(pipeline: impl Into<String>, message: impl ToString) -> Self {
        Self::Task { pipeline: pipeline.into(), message: message.to_string() }
    }

    /// Whether the top-level caller may remediate and restart
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_recoverable())
    }
}
