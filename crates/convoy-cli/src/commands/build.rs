//! Build command implementation

use std::path::PathBuf;

use color_eyre::eyre::{eyre, Context, Result};
use convoy_build::Convoy;
use convoy_config::Config;
use tracing::{info, warn};

/// Build command implementation
pub struct BuildCommand {
    config_path: PathBuf,
    databases: bool,
    report_path: Option<PathBuf>,
}

impl BuildCommand {
    pub fn new(config_path: PathBuf, databases: bool, report_path: Option<PathBuf>) -> Self {
        Self { config_path, databases, report_path }
    }

    pub async fn execute(&self) -> Result<()> {
        info!("Starting orchestrated build");

        let mut config = Config::from_file(&self.config_path).with_context(|| {
            format!("Failed to load config from {}", self.config_path.display())
        })?;

        if self.databases {
            config.database.enabled = true;
            if config.sql_tool.is_none() {
                return Err(eyre!("--databases requires a configured sql_tool"));
            }
        }

        info!("Workspace root: {}", config.root.display());
        info!("Artifact store: {}", config.store_dir.display());

        let convoy = Convoy::new(config)?;
        let report = convoy
            .run()
            .await
            .map_err(|e| eyre!("Build run failed: {e}"))?;

        if let Some(path) = &self.report_path {
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }

        for outcome in &report.outcomes {
            if let Some(error) = &outcome.error {
                warn!("{}: {}", outcome.module, error);
            }
        }

        if report.is_successful() {
            println!("\n✨ All {} modules processed successfully", report.stats.total_modules);
            Ok(())
        } else if report.stats.failed_modules > 0 {
            Err(eyre!(
                "{} of {} modules failed",
                report.stats.failed_modules,
                report.stats.total_modules
            ))
        } else {
            Err(eyre!("database rebuild failed"))
        }
    }
}
