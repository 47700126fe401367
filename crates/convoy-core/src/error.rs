//! Error types for the core library

use thiserror::Error;

/// Core error type for registry, graph and ordering operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed registry or declaration input
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A dependency declaration references a module that is not registered
    #[error("Module {module} depends on unknown module {dependency}")]
    UnknownModule { module: String, dependency: String },

    /// A module lists itself as a dependency
    #[error("Module {module} lists itself as a dependency")]
    SelfReference { module: String },

    /// No dependency-consistent order exists for the remaining modules
    #[error("Circular dependency among modules: {}", unresolved.join(", "))]
    CircularDependency {
        /// Modules that could not be placed
        unresolved: Vec<String>,
        /// Partial order found before the sort stalled
        resolved: Vec<String>,
    },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Whether the top-level caller may attempt remediation before retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownModule { .. })
    }
}
