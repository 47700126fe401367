//! Init command implementation

use std::path::PathBuf;

use color_eyre::eyre::{eyre, Context, Result};
use tracing::info;

const SAMPLE_CONFIG: &str = r#"# Convoy configuration
#
# Workspace root containing every module checkout
root: ${HOME}/workspace

# Module list: one `path = repoUrl` line per module; line order defines
# the original registry order
module_list: modules.list

# Staging directory for build artifacts shared between modules
store_dir: ${HOME}/workspace/artifact-store

# Per-module conventions (defaults shown)
lib_dir: Libraries
build_dir: Build
artifact_dir: Build/Output
dependency_file: Properties/dependencies.list

# Build tool; the module's build folder is appended to args
build_tool:
  program: dotnet
  args: ["build"]

# SQL tool; the script path is appended to args
# sql_tool:
#   program: psql
#   args: ["-f"]

# Database rebuilds (off by default)
database:
  enabled: false
  scripts_dir: DatabaseScripts
  create_script: CreateDatabase.sql
  migration_runner: RunMigrations.sql
  # dialect: postgres

# Transient sync retry
retry:
  max_attempts: 5
  initial_delay_ms: 1000
  max_delay_ms: 30000
  multiplier: 2.0

# External process timeouts
process:
  grace_secs: 30
  extension_secs: 120
"#;

/// Init command implementation
pub struct InitCommand {
    output: PathBuf,
    force: bool,
}

impl InitCommand {
    pub fn new(output: PathBuf, force: bool) -> Self {
        Self { output, force }
    }

    pub async fn execute(&self) -> Result<()> {
        if self.output.exists() && !self.force {
            return Err(eyre!(
                "{} already exists; pass --force to overwrite",
                self.output.display()
            ));
        }

        std::fs::write(&self.output, SAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", self.output.display()))?;

        info!("Wrote sample configuration to {}", self.output.display());
        println!("✓ Configuration written to {}", self.output.display());
        println!("  Edit the paths and build tool, then run `convoy validate`.");

        Ok(())
    }
}
