//! Error types for external process invocation

use std::io;

use thiserror::Error;

/// Process launch and wait failures.
///
/// A timeout is NOT an error: the runner kills the process and still
/// returns its (partial) output.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The executable could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Waiting on the child failed
    #[error("Failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Result type alias for execution operations
pub type Result<T> = std::result::Result<T, ExecError>;
