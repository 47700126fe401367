//! Validate command implementation

use std::path::PathBuf;

use color_eyre::eyre::{Context, Result};
use convoy_config::Config;
use convoy_core::{sort, DependencyGraph, LocalFileStore, ModuleSet};
use tracing::info;

/// Validate command implementation
pub struct ValidateCommand {
    config_path: PathBuf,
}

impl ValidateCommand {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::from_file(&self.config_path).with_context(|| {
            format!("Failed to load config from {}", self.config_path.display())
        })?;
        println!("✓ Configuration loaded and validated");

        let fs = LocalFileStore;
        let registry = ModuleSet::load(&fs, &config.module_list_path())?;
        println!("✓ Registry parsed: {} modules", registry.len());

        let graph =
            DependencyGraph::resolve(&registry, &fs, &config.root, &config.dependency_file)?;
        info!("Dependency graph resolved");

        let sorted = sort(graph)?;
        println!("✓ Dependency graph is acyclic");
        println!("\nBuild order:");
        for (position, module) in sorted.modules().iter().enumerate() {
            println!("  {:>3}. {}", position + 1, module.path);
        }

        Ok(())
    }
}
