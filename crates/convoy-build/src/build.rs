//! Module build pipeline

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use convoy_core::{FileStore, Module};
use convoy_exec::BuildTool;
use tracing::{debug, error, info, warn};

use crate::artifact::ArtifactStore;
use crate::context::{ModuleOutcome, ModuleStatus, RunContext};
use crate::error::{BuildError, Result};
use crate::progress::{ProgressEvent, ProgressUI};
use crate::signal::ReadyWaiter;

/// Bounded wait on a readiness signal before escalating to the
/// long-wait warning
const PATIENCE: Duration = Duration::from_secs(60);

/// Worker building every module in sorted order.
///
/// Failures are isolated per module: a broken build is recorded and the
/// pipeline moves on, so partial success is possible. The only hard stop is
/// the sync pipeline aborting underneath it.
pub struct BuildPipeline {
    tool: Arc<dyn BuildTool>,
    store: Arc<dyn ArtifactStore>,
    fs: Arc<dyn FileStore>,
    root: PathBuf,
    lib_dir: String,
    build_dir: String,
    artifact_dir: String,
    context: RunContext,
    progress: Arc<dyn ProgressUI>,
    patience: Duration,
}

impl BuildPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tool: Arc<dyn BuildTool>,
        store: Arc<dyn ArtifactStore>,
        fs: Arc<dyn FileStore>,
        root: PathBuf,
        lib_dir: String,
        build_dir: String,
        artifact_dir: String,
        context: RunContext,
        progress: Arc<dyn ProgressUI>,
    ) -> Self {
        Self {
            tool,
            store,
            fs,
            root,
            lib_dir,
            build_dir,
            artifact_dir,
            context,
            progress,
            patience: PATIENCE,
        }
    }

    /// Shrink the bounded readiness wait; test hook
    pub fn with_patience(mut self, patience: Duration) -> Self {
        self.patience = patience;
        self
    }

    /// Build every module once its readiness signal is set.
    ///
    /// `waiters` must be index-aligned with `modules`.
    pub async fn run(self, modules: Vec<Module>, waiters: Vec<ReadyWaiter>) -> Result<()> {
        debug_assert_eq!(modules.len(), waiters.len());
        info!("Build pipeline starting over {} modules", modules.len());
        let total = modules.len();

        for (index, (module, waiter)) in modules.iter().zip(waiters).enumerate() {
            self.await_readiness(module, waiter).await?;

            self.progress.update(&ProgressEvent::ModuleStart {
                name: module.path.clone(),
                current: Some(index + 1),
                total: Some(total),
            });

            let outcome = self.process_module(module).await;
            self.progress.update(&ProgressEvent::ModuleComplete {
                name: module.path.clone(),
                success: outcome.status != ModuleStatus::BuildFailed,
                error: outcome.error.clone(),
            });
            self.context.add_outcome(outcome);
        }

        info!("Build pipeline finished");
        Ok(())
    }

    /// Escalating patience: immediate check, bounded wait, unbounded wait
    async fn await_readiness(&self, module: &Module, mut waiter: ReadyWaiter) -> Result<()> {
        if waiter.is_ready() {
            return Ok(());
        }

        info!("Waiting for synchronization of {}", module.path);
        match waiter.wait_for(self.patience).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("Waiting a long time for synchronization of {}", module.path);
                waiter
                    .wait()
                    .await
                    .map_err(|_| BuildError::SyncAborted { module: module.path.clone() })
            }
            Err(_) => Err(BuildError::SyncAborted { module: module.path.clone() }),
        }
    }

    async fn process_module(&self, module: &Module) -> ModuleOutcome {
        let start = Instant::now();
        let module_dir = self.root.join(&module.path);

        // Dependency artifacts are copied in even when the build is skipped;
        // unbuildable modules may still be consumed as sources.
        let lib_dest = module_dir.join(&self.lib_dir);
        if self.fs.exists(&lib_dest) {
            // Stale libraries are cleared first; a delete failure is logged
            // and skipped, the copy overwrites what it can
            if let Err(e) = self.fs.delete(&lib_dest) {
                warn!("Failed to clear {} of {}: {e}, continuing", self.lib_dir, module.path);
            }
        }
        match self.store.copy_available_to(&lib_dest) {
            Ok(copied) => debug!("Copied {copied} dependency artifacts into {}", module.path),
            Err(e) => error!("Failed to copy dependencies into {}: {e}", module.path),
        }

        let build_path = module_dir.join(&self.build_dir);
        if !self.fs.exists(&build_path) {
            info!("Module {} has no build folder, skipping build", module.path);
            return ModuleOutcome {
                module: module.path.clone(),
                status: ModuleStatus::Skipped,
                error: None,
                duration: start.elapsed(),
            };
        }

        let (status, error) = match self.tool.build(&self.root, &build_path).await {
            Ok(0) => {
                info!("Built {}", module.path);
                (ModuleStatus::Built, None)
            }
            Ok(code) => {
                error!("Build of {} failed with exit code {code}", module.path);
                (ModuleStatus::BuildFailed, Some(format!("exit code {code}")))
            }
            Err(e) => {
                error!("Build of {} failed: {e}", module.path);
                (ModuleStatus::BuildFailed, Some(e.to_string()))
            }
        };

        // Success or failure, whatever landed in the output folder becomes
        // available to later modules
        let outputs = module_dir.join(&self.artifact_dir);
        match self.store.register_outputs(&outputs) {
            Ok(registered) => debug!("Registered {registered} artifacts from {}", module.path),
            Err(e) => error!("Failed to register outputs of {}: {e}", module.path),
        }

        ModuleOutcome {
            module: module.path.clone(),
            status,
            error,
            duration: start.elapsed(),
        }
    }
}
