//! Clean command implementation

use std::path::PathBuf;

use color_eyre::eyre::{Context, Result};
use convoy_build::DirArtifactStore;
use convoy_config::Config;
use tracing::info;

/// Clean command implementation
pub struct CleanCommand {
    config_path: PathBuf,
}

impl CleanCommand {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::from_file(&self.config_path).with_context(|| {
            format!("Failed to load config from {}", self.config_path.display())
        })?;

        let store = DirArtifactStore::new(&config.store_dir)?;
        let removed = store.clear()?;
        info!("Cleared {} entries from {}", removed, config.store_dir.display());
        println!("✓ Artifact store emptied ({removed} entries)");

        Ok(())
    }
}
