//! Repository sync pipeline

use std::path::PathBuf;
use std::sync::Arc;

use convoy_core::{FileStore, Module};
use convoy_exec::VcsClient;
use tracing::{debug, info};

use crate::error::{BuildError, Result};
use crate::recovery::{retry_transient, RetryConfig, RetryError};
use crate::signal::ReadySender;

/// Worker updating every module repository in sorted order.
///
/// Sync is all-or-nothing: the first non-transient failure aborts the run
/// naming the module. Dropping the remaining senders on abort wakes the
/// build pipeline out of its readiness waits.
pub struct SyncPipeline {
    vcs: Arc<dyn VcsClient>,
    fs: Arc<dyn FileStore>,
    root: PathBuf,
    lib_dir: String,
    retry: RetryConfig,
}

impl SyncPipeline {
    pub fn new(
        vcs: Arc<dyn VcsClient>,
        fs: Arc<dyn FileStore>,
        root: PathBuf,
        lib_dir: String,
        retry: RetryConfig,
    ) -> Self {
        Self { vcs, fs, root, lib_dir, retry }
    }

    /// Sync every module, signaling readiness after each success.
    ///
    /// `senders` must be index-aligned with `modules`.
    pub async fn run(self, modules: Vec<Module>, senders: Vec<ReadySender>) -> Result<()> {
        debug_assert_eq!(modules.len(), senders.len());
        info!("Sync pipeline starting over {} modules", modules.len());

        for (module, sender) in modules.iter().zip(senders) {
            self.sync_module(module).await?;
            // Exactly once per module, regardless of how many retries it took
            sender.mark_ready();
        }

        info!("Sync pipeline finished");
        Ok(())
    }

    async fn sync_module(&self, module: &Module) -> Result<()> {
        let module_dir = self.root.join(&module.path);
        let lib_path = module_dir.join(&self.lib_dir);

        debug!("Synchronizing {}", module.path);

        let result = retry_transient(&module.path, &self.retry, || async {
            // Generated files in the library folder must not block the
            // fast-forward pull
            if self.fs.exists(&lib_path) {
                self.vcs.discard_local_changes(&lib_path).await?;
            }
            self.vcs.pull_current_branch(&module_dir).await
        })
        .await;

        match result {
            Ok(()) => {
                info!("Synchronized {}", module.path);
                Ok(())
            }
            Err(RetryError::Fatal(source)) => {
                Err(BuildError::FatalSync { module: module.path.clone(), source })
            }
            Err(RetryError::Exhausted { attempts, last }) => Err(BuildError::RetriesExhausted {
                module: module.path.clone(),
                attempts,
                source: last,
            }),
        }
    }
}
