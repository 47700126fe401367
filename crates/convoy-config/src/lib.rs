//! Configuration management for Convoy
//!
//! This crate handles YAML configuration parsing, validation,
//! and environment variable substitution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use convoy_core::error::{CoreError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace root containing every module checkout
    pub root: PathBuf,

    /// Module list file, `path = repoUrl` per line
    pub module_list: PathBuf,

    /// Staging directory for the artifact store
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Library subfolder inside each module that receives dependency
    /// artifacts
    #[serde(default = "default_lib_dir")]
    pub lib_dir: String,

    /// Build subfolder whose presence makes a module buildable
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Subfolder inside each module where its own build outputs land
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    /// Dependency declaration file, relative to each module
    #[serde(default = "default_dependency_file")]
    pub dependency_file: PathBuf,

    /// Build tool invocation
    pub build_tool: ToolConfig,

    /// SQL execution tool invocation
    #[serde(default)]
    pub sql_tool: Option<ToolConfig>,

    /// Database rebuild settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Transient sync retry settings
    #[serde(default)]
    pub retry: RetrySettings,

    /// External process timeout settings
    #[serde(default)]
    pub process: ProcessSettings,
}

/// A configured external command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable to invoke
    pub program: String,

    /// Base arguments, the target path is appended after these
    #[serde(default)]
    pub args: Vec<String>,
}

/// Database rebuild settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Whether the database rebuild pipeline runs at all
    #[serde(default)]
    pub enabled: bool,

    /// Database scripts subfolder inside each module
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Base create-database script, relative to the scripts folder
    #[serde(default = "default_create_script")]
    pub create_script: String,

    /// Migration-runner script, relative to the scripts folder
    #[serde(default = "default_migration_runner")]
    pub migration_runner: String,

    /// Preferred dialect subfolder inside the scripts folder
    #[serde(default)]
    pub dialect: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scripts_dir: default_scripts_dir(),
            create_script: default_create_script(),
            migration_runner: default_migration_runner(),
            dialect: None,
        }
    }
}

/// Transient sync retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum number of attempts per module
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between attempts, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between attempts, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// External process timeout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSettings {
    /// First wait window before warning, in seconds
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,

    /// Additional wait window before forced termination, in seconds
    #[serde(default = "default_extension_secs")]
    pub extension_secs: u64,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self { grace_secs: default_grace_secs(), extension_secs: default_extension_secs() }
    }
}

impl ProcessSettings {
    /// First wait window
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }

    /// Additional wait window
    pub fn extension(&self) -> Duration {
        Duration::from_secs(self.extension_secs)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;

        let mut config: Config = serde_yaml::from_str(&content)
            .map_err(|e| CoreError::configuration(format!("Failed to parse YAML: {e}")))?;

        config.expand_env_vars()?;
        config.validate()?;

        Ok(config)
    }

    /// Expand environment variables in paths
    fn expand_env_vars(&mut self) -> Result<()> {
        self.root = expand_path(&self.root)?;
        self.module_list = expand_path(&self.module_list)?;
        self.store_dir = expand_path(&self.store_dir)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.root.exists() {
            return Err(CoreError::configuration(format!(
                "Workspace root does not exist: {0:?}",
                self.root
            )));
        }

        if !self.module_list_path().exists() {
            return Err(CoreError::configuration(format!(
                "Module list does not exist: {0:?}",
                self.module_list_path()
            )));
        }

        if !self.store_dir.exists() {
            std::fs::create_dir_all(&self.store_dir).map_err(|e| {
                CoreError::configuration(format!("Failed to create store_dir: {e}"))
            })?;
        }

        if self.build_tool.program.is_empty() {
            return Err(CoreError::configuration("build_tool.program cannot be empty"));
        }

        if self.database.enabled && self.sql_tool.is_none() {
            return Err(CoreError::configuration(
                "database rebuilds are enabled but no sql_tool is configured",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(CoreError::configuration("retry.max_attempts must be at least 1"));
        }

        if self.process.grace_secs == 0 || self.process.extension_secs == 0 {
            return Err(CoreError::configuration("process timeouts must be at least 1 second"));
        }

        Ok(())
    }

    /// Module list path, resolved against the workspace root when relative
    pub fn module_list_path(&self) -> PathBuf {
        if self.module_list.is_absolute() {
            self.module_list.clone()
        } else {
            self.root.join(&self.module_list)
        }
    }
}

/// Expand environment variables in a path
fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    let env_var_re =
        Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex");

    let mut result = path_str.to_string();
    for cap in env_var_re.captures_iter(&path_str) {
        let var_name = cap.get(1).or_else(|| cap.get(2)).unwrap().as_str();
        let var_value = std::env::var(var_name).map_err(|_| {
            CoreError::configuration(format!("Environment variable not found: {var_name}"))
        })?;

        result = result.replace(&cap[0], &var_value);
    }

    Ok(PathBuf::from(result))
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./artifact-store")
}

fn default_lib_dir() -> String {
    "Libraries".to_string()
}

fn default_build_dir() -> String {
    "Build".to_string()
}

fn default_artifact_dir() -> String {
    "Build/Output".to_string()
}

fn default_dependency_file() -> PathBuf {
    PathBuf::from("Properties/dependencies.list")
}

fn default_scripts_dir() -> String {
    "DatabaseScripts".to_string()
}

fn default_create_script() -> String {
    "CreateDatabase.sql".to_string()
}

fn default_migration_runner() -> String {
    "RunMigrations.sql".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_grace_secs() -> u64 {
    30
}

fn default_extension_secs() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use std::env;

    use tempfile::TempDir;

    use super::*;

    fn tool(program: &str) -> ToolConfig {
        ToolConfig { program: program.to_string(), args: vec![] }
    }

    fn base_config(dir: &TempDir) -> Config {
        let root = dir.path().join("workspace");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("modules.list"), "app = https://git.example.com/app.git\n")
            .unwrap();

        Config {
            root,
            module_list: PathBuf::from("modules.list"),
            store_dir: dir.path().join("store"),
            lib_dir: default_lib_dir(),
            build_dir: default_build_dir(),
            artifact_dir: default_artifact_dir(),
            dependency_file: default_dependency_file(),
            build_tool: tool("true"),
            sql_tool: None,
            database: DatabaseConfig::default(),
            retry: RetrySettings::default(),
            process: ProcessSettings::default(),
        }
    }

    #[test]
    fn test_expand_path() {
        env::set_var("CONVOY_TEST_VAR", "/test/path");

        let path = PathBuf::from("${CONVOY_TEST_VAR}/sub");
        let expanded = expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/path/sub"));

        let path = PathBuf::from("$CONVOY_TEST_VAR/sub");
        let expanded = expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/path/sub"));
    }

    #[test]
    fn test_config_validation_creates_store_dir() {
        let dir = TempDir::new().unwrap();
        let config = base_config(&dir);

        assert!(config.validate().is_ok());
        assert!(config.store_dir.exists());
    }

    #[test]
    fn missing_module_list_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = base_config(&dir);
        config.module_list = PathBuf::from("nope.list");

        assert!(config.validate().is_err());
    }

    #[test]
    fn database_without_sql_tool_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = base_config(&dir);
        config.database.enabled = true;

        assert!(config.validate().is_err());

        config.sql_tool = Some(tool("psql"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_defaults_round_trip() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("ws");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("modules.list"), "a = u\n").unwrap();

        let yaml = format!(
            "root: {}\nmodule_list: modules.list\nstore_dir: {}\nbuild_tool:\n  program: make\n",
            root.display(),
            dir.path().join("store").display()
        );
        let file = dir.path().join("convoy.yaml");
        std::fs::write(&file, yaml).unwrap();

        let config = Config::from_file(&file).unwrap();
        assert_eq!(config.lib_dir, "Libraries");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.process.grace_secs, 30);
        assert_eq!(config.process.extension_secs, 120);
        assert!(!config.database.enabled);
    }
}
