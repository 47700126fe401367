//! Pipeline orchestration for Convoy
//!
//! This crate coordinates the repository sync, module build and database
//! rebuild pipelines, hands modules between them via readiness signals,
//! and tracks run statistics.

pub mod artifact;
pub mod build;
pub mod context;
pub mod database;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod recovery;
pub mod signal;
pub mod sync;

pub use artifact::{ArtifactStore, DirArtifactStore};
pub use build::BuildPipeline;
pub use context::{ModuleOutcome, ModuleStatus, RunContext, RunReport, RunState, RunStats};
pub use database::{dedup_for_rebuild, DatabaseOutcome, DatabasePipeline};
pub use error::{BuildError, Result};
pub use orchestrator::Convoy;
pub use progress::{
    IndicatifProgressUI, LogLevel, NoOpProgressUI, ProgressEvent, ProgressUI, ProgressUIFactory,
};
pub use recovery::{retry_transient, RetryConfig, RetryError};
pub use signal::{ready_channels, ReadySender, ReadyWaiter, SignalAborted};
pub use sync::SyncPipeline;
