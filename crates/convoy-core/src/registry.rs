//! Module registry parsing

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::fs::FileStore;

/// An independently versioned source module mapped to one filesystem path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Module {
    /// Path of the module relative to the workspace root; also its name
    pub path: String,

    /// URL of the repository backing this module
    pub repo_url: String,

    /// Registry indices of the modules this module depends on
    #[serde(default)]
    pub dependencies: Vec<usize>,
}

impl Module {
    /// Create a module with no resolved dependencies yet
    pub fn new(path: impl Into<String>, repo_url: impl Into<String>) -> Self {
        Self { path: path.into(), repo_url: repo_url.into(), dependencies: Vec::new() }
    }
}

/// Ordered, index-addressed collection of registered modules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSet {
    modules: Vec<Module>,
}

impl ModuleSet {
    /// Parse a module list.
    ///
    /// Each non-blank line is `path = repoUrl`, split on the first `=` with
    /// both sides trimmed. Line order defines the original module index.
    pub fn parse(source: &str) -> Result<Self> {
        let mut modules = Vec::new();

        for (line_no, line) in source.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let (path, repo_url) = line.split_once('=').ok_or_else(|| {
                CoreError::configuration(format!(
                    "Malformed module list line {}: expected `path = repoUrl`, got {line:?}",
                    line_no + 1
                ))
            })?;

            let path = path.trim();
            let repo_url = repo_url.trim();
            if path.is_empty() || repo_url.is_empty() {
                return Err(CoreError::configuration(format!(
                    "Malformed module list line {}: empty path or repository URL",
                    line_no + 1
                )));
            }

            modules.push(Module::new(path, repo_url));
        }

        Ok(Self { modules })
    }

    /// Load and parse a module list file
    pub fn load(fs: &dyn FileStore, path: &Path) -> Result<Self> {
        let lines = fs.read_lines(path).map_err(|e| {
            CoreError::configuration(format!(
                "Failed to read module list {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&lines.join("\n"))
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registry index of the module with exactly this path
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.path == path)
    }

    /// All modules in registry order
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Consume the set, yielding the module vector
    pub fn into_modules(self) -> Vec<Module> {
        self.modules
    }
}

impl From<Vec<Module>> for ModuleSet {
    fn from(modules: Vec<Module>) -> Self {
        Self { modules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_and_url_around_first_equals() {
        let set = ModuleSet::parse("Core/App = https://git.example.com/app.git\n").unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.modules()[0].path, "Core/App");
        assert_eq!(set.modules()[0].repo_url, "https://git.example.com/app.git");
    }

    #[test]
    fn splits_on_first_equals_only() {
        let set = ModuleSet::parse("tools = https://example.com/a?x=1").unwrap();
        assert_eq!(set.modules()[0].repo_url, "https://example.com/a?x=1");
    }

    #[test]
    fn line_order_defines_index() {
        let set = ModuleSet::parse("b = u1\na = u2\n").unwrap();
        assert_eq!(set.index_of("b"), Some(0));
        assert_eq!(set.index_of("a"), Some(1));
        assert_eq!(set.index_of("missing"), None);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let set = ModuleSet::parse("a = u1\n\n   \nb = u2\n").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.index_of("b"), Some(1));
    }

    #[test]
    fn line_without_equals_is_a_configuration_error() {
        let err = ModuleSet::parse("a = u1\nnot a module line\n").unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_side_is_a_configuration_error() {
        assert!(ModuleSet::parse("= url").is_err());
        assert!(ModuleSet::parse("path =").is_err());
    }
}
