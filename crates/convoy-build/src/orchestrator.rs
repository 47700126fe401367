//! Run orchestration

use std::sync::Arc;

use convoy_config::Config;
use convoy_core::{
    sort, CoreError, DependencyGraph, FileStore, LocalFileStore, Module, ModuleSet,
};
use convoy_exec::{
    BuildTool, CommandBuildTool, CommandSqlRunner, GitCli, ProcessRunner, SqlRunner, VcsClient,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::artifact::{ArtifactStore, DirArtifactStore};
use crate::build::BuildPipeline;
use crate::context::{RunContext, RunReport, RunState};
use crate::database::{DatabaseOutcome, DatabasePipeline};
use crate::error::{BuildError, Result};
use crate::progress::{ProgressEvent, ProgressUI, ProgressUIFactory};
use crate::signal::ready_channels;
use crate::sync::SyncPipeline;

/// Top-level orchestrator wiring the pipelines over the collaborators
pub struct Convoy {
    config: Config,
    fs: Arc<dyn FileStore>,
    vcs: Arc<dyn VcsClient>,
    tool: Arc<dyn BuildTool>,
    sql: Option<Arc<dyn SqlRunner>>,
    store: Arc<dyn ArtifactStore>,
    progress: Arc<dyn ProgressUI>,
}

impl Convoy {
    /// Create an orchestrator with the standard collaborators: local
    /// filesystem, git CLI, configured build/SQL commands.
    pub fn new(config: Config) -> Result<Self> {
        let runner = ProcessRunner::new(config.process.grace(), config.process.extension());

        let vcs: Arc<dyn VcsClient> = Arc::new(GitCli::new(runner));
        let tool: Arc<dyn BuildTool> = Arc::new(CommandBuildTool::new(
            runner,
            config.build_tool.program.clone(),
            config.build_tool.args.clone(),
        ));
        let sql: Option<Arc<dyn SqlRunner>> = config.sql_tool.as_ref().map(|t| {
            Arc::new(CommandSqlRunner::new(runner, t.program.clone(), t.args.clone()))
                as Arc<dyn SqlRunner>
        });
        let store: Arc<dyn ArtifactStore> = Arc::new(DirArtifactStore::new(&config.store_dir)?);
        let progress = ProgressUIFactory::create(true);

        Ok(Self {
            config,
            fs: Arc::new(LocalFileStore),
            vcs,
            tool,
            sql,
            store,
            progress,
        })
    }

    /// Create an orchestrator over explicit collaborators; test seam
    pub fn with_collaborators(
        config: Config,
        fs: Arc<dyn FileStore>,
        vcs: Arc<dyn VcsClient>,
        tool: Arc<dyn BuildTool>,
        sql: Option<Arc<dyn SqlRunner>>,
        store: Arc<dyn ArtifactStore>,
        progress: Arc<dyn ProgressUI>,
    ) -> Self {
        Self { config, fs, vcs, tool, sql, store, progress }
    }

    /// Load the registry, resolve the graph and compute the build order.
    ///
    /// An unknown dependency triggers the one-shot remediation pass (sync
    /// every registered module, clone missing repositories) and then
    /// re-raises the original error so the operator restarts the run
    /// against the repaired workspace.
    pub async fn prepare(&self) -> Result<DependencyGraph> {
        let registry = ModuleSet::load(&*self.fs, &self.config.module_list_path())?;
        info!("Loaded {} modules from the registry", registry.len());

        let graph = match DependencyGraph::resolve(
            &registry,
            &*self.fs,
            &self.config.root,
            &self.config.dependency_file,
        ) {
            Ok(graph) => graph,
            Err(err @ CoreError::UnknownModule { .. }) => {
                warn!("{err}; remediating by syncing all modules and cloning missing repositories");
                self.remediate(&registry).await?;
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let sorted = sort(graph)?;
        info!(
            "Build order: {}",
            sorted
                .modules()
                .iter()
                .map(|m| m.path.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Ok(sorted)
    }

    /// Bring the workspace up to date so a restart can resolve every
    /// declared dependency
    async fn remediate(&self, registry: &ModuleSet) -> Result<()> {
        for module in registry.modules() {
            let module_dir = self.config.root.join(&module.path);
            if self.fs.exists(&module_dir) {
                self.vcs.pull_latest(&module_dir).await.map_err(|source| {
                    BuildError::Remediation { module: module.path.clone(), source }
                })?;
            } else {
                info!("Cloning missing module {}", module.path);
                self.vcs
                    .clone_repo(&self.config.root, &module.path, &module.repo_url)
                    .await
                    .map_err(|source| BuildError::Remediation {
                        module: module.path.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Run the whole orchestration: prepare, then sync + build (+ database)
    /// concurrently.
    ///
    /// Per-module build failures land in the report; only configuration
    /// errors and fatal sync failures surface as `Err`.
    pub async fn run(&self) -> Result<RunReport> {
        let context = RunContext::new(0);
        context.set_state(RunState::Preparing);
        self.progress.update(&ProgressEvent::Stage { name: "prepare".to_string() });

        let sorted = match self.prepare().await {
            Ok(sorted) => sorted,
            Err(e) => {
                context.set_state(RunState::Failed);
                return Err(e);
            }
        };

        let modules = sorted.into_modules();
        context.set_total(modules.len());
        context.set_state(RunState::Running);
        self.progress.update(&ProgressEvent::Stage { name: "sync + build".to_string() });

        let (senders, waiters) = ready_channels(modules.len());

        let sync = SyncPipeline::new(
            Arc::clone(&self.vcs),
            Arc::clone(&self.fs),
            self.config.root.clone(),
            self.config.lib_dir.clone(),
            (&self.config.retry).into(),
        );
        let build = BuildPipeline::new(
            Arc::clone(&self.tool),
            Arc::clone(&self.store),
            Arc::clone(&self.fs),
            self.config.root.clone(),
            self.config.lib_dir.clone(),
            self.config.build_dir.clone(),
            self.config.artifact_dir.clone(),
            context.clone(),
            Arc::clone(&self.progress),
        );

        let sync_handle = tokio::spawn(sync.run(modules.clone(), senders));
        let build_handle = tokio::spawn(build.run(modules.clone(), waiters));
        let db_handle = self.spawn_database(&modules);

        // The caller blocks until the build pipeline finishes; a fatal sync
        // error wakes it through the dropped senders.
        let build_result = build_handle
            .await
            .map_err(|e| BuildError::task("build", e))?;
        let sync_result = sync_handle
            .await
            .map_err(|e| BuildError::task("sync", e))?;

        // The sync failure caused whatever abort the build pipeline saw;
        // report the cause, not the symptom.
        if let Err(e) = sync_result {
            context.set_state(RunState::Failed);
            self.progress.finish();
            return Err(e);
        }
        build_result?;

        let database = match db_handle {
            Some(handle) => {
                Some(handle.await.map_err(|e| BuildError::task("database", e))?)
            }
            None => None,
        };

        let report = RunReport {
            stats: context.stats(),
            outcomes: context.outcomes(),
            database,
        };
        context.set_state(if report.is_successful() {
            RunState::Completed
        } else {
            RunState::Failed
        });
        self.progress.finish();
        info!("{}", context.summary());

        Ok(report)
    }

    fn spawn_database(&self, modules: &[Module]) -> Option<JoinHandle<Vec<DatabaseOutcome>>> {
        if !self.config.database.enabled {
            return None;
        }
        let sql = self.sql.as_ref()?;

        let pipeline = DatabasePipeline::new(
            Arc::clone(sql),
            Arc::clone(&self.fs),
            self.config.root.clone(),
            self.config.database.clone(),
        );
        Some(tokio::spawn(pipeline.run(modules.to_vec())))
    }
}
