//! Database rebuild pipeline

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use convoy_config::DatabaseConfig;
use convoy_core::{FileStore, Module};
use convoy_exec::SqlRunner;
use serde::Serialize;
use tracing::{debug, error, info};

/// Per-module database rebuild result
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseOutcome {
    /// Module path
    pub module: String,
    /// Number of scripts executed
    pub scripts_run: usize,
    /// Error message if a script failed
    pub error: Option<String>,
}

/// Worker rebuilding databases for the deduplicated module list.
///
/// Runs independently of the sync/build hand-off. Script failures isolate
/// to their module; the pipeline always finishes.
pub struct DatabasePipeline {
    sql: Arc<dyn SqlRunner>,
    fs: Arc<dyn FileStore>,
    root: PathBuf,
    config: DatabaseConfig,
}

impl DatabasePipeline {
    pub fn new(
        sql: Arc<dyn SqlRunner>,
        fs: Arc<dyn FileStore>,
        root: PathBuf,
        config: DatabaseConfig,
    ) -> Self {
        Self { sql, fs, root, config }
    }

    /// Rebuild the database of every surviving module
    pub async fn run(self, modules: Vec<Module>) -> Vec<DatabaseOutcome> {
        let survivors = dedup_for_rebuild(&modules, &self.config.scripts_dir);
        info!(
            "Database pipeline starting over {} of {} modules",
            survivors.len(),
            modules.len()
        );

        let mut outcomes = Vec::with_capacity(survivors.len());
        for module in survivors {
            outcomes.push(self.rebuild_module(module).await);
        }

        info!("Database pipeline finished");
        outcomes
    }

    async fn rebuild_module(&self, module: &Module) -> DatabaseOutcome {
        let module_dir = self.root.join(&module.path);
        let scripts_root = module_dir.join(&self.config.scripts_dir);

        let migration_runner = scripts_root.join(&self.config.migration_runner);
        let result = if self.fs.exists(&migration_runner) {
            self.rebuild_via_migrations(&module_dir, &scripts_root, &migration_runner)
                .await
        } else {
            self.rebuild_from_scripts(&module_dir, &scripts_root).await
        };

        match result {
            Ok(scripts_run) => {
                if scripts_run > 0 {
                    info!("Rebuilt database of {} ({scripts_run} scripts)", module.path);
                }
                DatabaseOutcome { module: module.path.clone(), scripts_run, error: None }
            }
            Err((scripts_run, message)) => {
                error!("Database rebuild of {} failed: {message}", module.path);
                DatabaseOutcome {
                    module: module.path.clone(),
                    scripts_run,
                    error: Some(message),
                }
            }
        }
    }

    /// Base create script, then the migration runner
    async fn rebuild_via_migrations(
        &self,
        module_dir: &Path,
        scripts_root: &Path,
        migration_runner: &Path,
    ) -> std::result::Result<usize, (usize, String)> {
        debug!("Rebuilding {} via migrations", module_dir.display());

        let create = scripts_root.join(&self.config.create_script);
        self.sql
            .run_script(module_dir, &create)
            .await
            .map_err(|e| (0, e.to_string()))?;
        self.sql
            .run_script(module_dir, migration_runner)
            .await
            .map_err(|e| (1, e.to_string()))?;

        Ok(2)
    }

    /// Every raw script under the scripts folder, in fixed descending order
    async fn rebuild_from_scripts(
        &self,
        module_dir: &Path,
        scripts_root: &Path,
    ) -> std::result::Result<usize, (usize, String)> {
        let scripts_dir = self.locate_scripts_dir(scripts_root);
        if !self.fs.exists(&scripts_dir) {
            debug!("No database scripts under {}", module_dir.display());
            return Ok(0);
        }

        let scripts = self
            .fs
            .list_descendants(&scripts_dir, "sql")
            .map_err(|e| (0, e.to_string()))?;
        let scripts = script_order(scripts);

        let mut run = 0;
        for script in &scripts {
            self.sql
                .run_script(module_dir, script)
                .await
                .map_err(|e| (run, e.to_string()))?;
            run += 1;
        }

        Ok(run)
    }

    /// Prefer the dialect-specific subfolder when one exists
    fn locate_scripts_dir(&self, scripts_root: &Path) -> PathBuf {
        if let Some(dialect) = &self.config.dialect {
            let specific = scripts_root.join(dialect);
            if self.fs.exists(&specific) {
                return specific;
            }
        }
        scripts_root.to_path_buf()
    }
}

/// Deduplicate the sorted module list for database work: keep the first
/// module per repository URL, then drop any module whose path is exactly
/// another kept module's nested scripts subfolder.
pub fn dedup_for_rebuild<'a>(modules: &'a [Module], scripts_dir: &str) -> Vec<&'a Module> {
    let mut seen_urls = HashSet::new();
    let kept: Vec<&Module> = modules
        .iter()
        .filter(|m| seen_urls.insert(m.repo_url.as_str()))
        .collect();

    let embedded: HashSet<String> = kept
        .iter()
        .map(|m| format!("{}/{}", m.path, scripts_dir))
        .collect();

    kept.into_iter()
        .filter(|m| !embedded.contains(&m.path))
        .collect()
}

/// Descending lexicographic path order.
///
/// Preserved from the behavior this pipeline replaces; flip here once an
/// ascending order is confirmed as intended.
fn script_order(mut scripts: Vec<PathBuf>) -> Vec<PathBuf> {
    scripts.sort();
    scripts.reverse();
    scripts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str, url: &str) -> Module {
        Module {
            path: path.to_string(),
            repo_url: url.to_string(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn dedup_keeps_first_module_per_repository() {
        let modules = vec![
            module("repo1/App", "url1"),
            module("repo1/App/databasescripts", "url1"),
            module("repo2/Other", "url2"),
        ];

        let kept = dedup_for_rebuild(&modules, "databasescripts");
        let paths: Vec<&str> = kept.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["repo1/App", "repo2/Other"]);
    }

    #[test]
    fn dedup_drops_embedded_scripts_module_with_distinct_url() {
        let modules = vec![
            module("repo1/App", "url1"),
            module("repo1/App/databasescripts", "url-other"),
            module("repo2/Other", "url2"),
        ];

        let kept = dedup_for_rebuild(&modules, "databasescripts");
        let paths: Vec<&str> = kept.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["repo1/App", "repo2/Other"]);
    }

    #[test]
    fn dedup_keeps_similarly_named_sibling() {
        let modules = vec![
            module("repo1/App", "url1"),
            module("repo1/App2", "url2"),
        ];

        let kept = dedup_for_rebuild(&modules, "databasescripts");
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn scripts_execute_in_descending_name_order() {
        let scripts = vec![
            PathBuf::from("scripts/001_init.sql"),
            PathBuf::from("scripts/010_data.sql"),
            PathBuf::from("scripts/002_schema.sql"),
        ];

        let ordered = script_order(scripts);
        assert_eq!(
            ordered,
            vec![
                PathBuf::from("scripts/010_data.sql"),
                PathBuf::from("scripts/002_schema.sql"),
                PathBuf::from("scripts/001_init.sql"),
            ]
        );
    }
}
