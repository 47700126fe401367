//! Run context and statistics

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::DatabaseOutcome;

/// Run state enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Initial state
    Idle,
    /// Loading the registry, resolving and ordering the graph
    Preparing,
    /// Pipelines running
    Running,
    /// Run completed
    Completed,
    /// Run aborted
    Failed,
}

/// What happened to one module in the build pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Build tool ran and exited zero
    Built,
    /// Build tool exited non-zero or could not run
    BuildFailed,
    /// Module has no build folder
    Skipped,
}

/// Per-module build pipeline result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutcome {
    /// Module path
    pub module: String,
    /// What happened
    pub status: ModuleStatus,
    /// Error message if the build failed
    pub error: Option<String>,
    /// Time spent on this module
    pub duration: Duration,
}

/// Aggregate run statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Total modules in the build order
    pub total_modules: usize,
    /// Successfully built modules
    pub built_modules: usize,
    /// Failed modules
    pub failed_modules: usize,
    /// Modules without a build folder
    pub skipped_modules: usize,
    /// Run start time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Run end time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl RunStats {
    /// Wall-clock duration of the run so far
    pub fn duration(&self) -> Option<Duration> {
        let start = self.start_time?;
        let end = self.end_time.unwrap_or_else(Utc::now);
        let millis = (end.timestamp_millis() - start.timestamp_millis()).max(0);
        Some(Duration::from_millis(millis as u64))
    }

    /// Whether every module has an outcome
    pub fn is_complete(&self) -> bool {
        self.built_modules + self.failed_modules + self.skipped_modules >= self.total_modules
    }
}

/// Shared run state, cloneable across pipeline tasks
#[derive(Debug, Clone)]
pub struct RunContext {
    state: Arc<Mutex<RunState>>,
    stats: Arc<Mutex<RunStats>>,
    outcomes: Arc<Mutex<Vec<ModuleOutcome>>>,
}

impl RunContext {
    /// Create a context for a run over `total_modules` modules
    pub fn new(total_modules: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::Idle)),
            stats: Arc::new(Mutex::new(RunStats {
                total_modules,
                ..RunStats::default()
            })),
            outcomes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap()
    }

    /// Set the run state, stamping start/end times
    pub fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap() = state;

        match state {
            RunState::Running => {
                self.stats.lock().unwrap().start_time = Some(Utc::now());
            }
            RunState::Completed | RunState::Failed => {
                self.stats.lock().unwrap().end_time = Some(Utc::now());
            }
            _ => {}
        }
    }

    /// Set the module count once the build order is known
    pub fn set_total(&self, total_modules: usize) {
        self.stats.lock().unwrap().total_modules = total_modules;
    }

    /// Record one module's outcome
    pub fn add_outcome(&self, outcome: ModuleOutcome) {
        {
            let mut stats = self.stats.lock().unwrap();
            match outcome.status {
                ModuleStatus::Built => stats.built_modules += 1,
                ModuleStatus::BuildFailed => stats.failed_modules += 1,
                ModuleStatus::Skipped => stats.skipped_modules += 1,
            }
        }
        self.outcomes.lock().unwrap().push(outcome);
    }

    /// Snapshot of the statistics
    pub fn stats(&self) -> RunStats {
        self.stats.lock().unwrap().clone()
    }

    /// Snapshot of all recorded outcomes
    pub fn outcomes(&self) -> Vec<ModuleOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    /// Whether every module processed and none failed
    pub fn is_successful(&self) -> bool {
        let stats = self.stats();
        stats.is_complete() && stats.failed_modules == 0
    }

    /// Human-readable run summary
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let duration = stats
            .duration()
            .map(|d| format!(" in {:.1}s", d.as_secs_f32()))
            .unwrap_or_default();

        format!(
            "Built {}/{} modules{}. {} failed, {} skipped.",
            stats.built_modules,
            stats.total_modules,
            duration,
            stats.failed_modules,
            stats.skipped_modules
        )
    }
}

/// Final report of one orchestrator run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Aggregate statistics
    pub stats: RunStats,
    /// Per-module build outcomes, in build order
    pub outcomes: Vec<ModuleOutcome>,
    /// Database rebuild outcomes, when that pipeline ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<Vec<DatabaseOutcome>>,
}

impl RunReport {
    /// Whether the run finished with no failed modules or scripts
    pub fn is_successful(&self) -> bool {
        self.stats.failed_modules == 0
            && self
                .database
                .as_ref()
                .map_or(true, |db| db.iter().all(|o| o.error.is_none()))
    }
}
