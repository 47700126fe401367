//! Dependency graph construction

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::{CoreError, Result};
use crate::fs::FileStore;
use crate::registry::{Module, ModuleSet};

/// Modules plus their resolved dependency edges (dependant → dependency,
/// stored as registry indices on each module)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    modules: Vec<Module>,
}

impl DependencyGraph {
    /// Build a graph over a registry, resolving each module's dependency
    /// declaration file.
    ///
    /// The declaration file lives at `<root>/<module path>/<decl_rel_path>`;
    /// each non-blank line names another registered module path, matched
    /// exactly. Edges are accumulated for every reference that resolves,
    /// even when another reference in the same run fails, so the full graph
    /// is available to the caller's remediation handling. The first
    /// unresolved name is raised as [`CoreError::UnknownModule`]; every
    /// unresolved name is logged.
    pub fn resolve(
        registry: &ModuleSet,
        fs: &dyn FileStore,
        root: &Path,
        decl_rel_path: &Path,
    ) -> Result<Self> {
        let mut modules = registry.modules().to_vec();
        let mut first_unknown: Option<(String, String)> = None;

        for index in 0..modules.len() {
            let decl = declaration_path(root, &modules[index].path, decl_rel_path);
            if !fs.exists(&decl) {
                debug!("Module {} has no dependency declaration", modules[index].path);
                continue;
            }

            let lines = fs.read_lines(&decl)?;
            for name in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
                match registry.index_of(name) {
                    Some(dep_index) => modules[index].dependencies.push(dep_index),
                    None => {
                        error!(
                            "Module {} depends on unknown module {name}",
                            modules[index].path
                        );
                        if first_unknown.is_none() {
                            first_unknown =
                                Some((modules[index].path.clone(), name.to_string()));
                        }
                    }
                }
            }
        }

        if let Some((module, dependency)) = first_unknown {
            return Err(CoreError::UnknownModule { module, dependency });
        }

        Ok(Self { modules })
    }

    /// Graph over modules whose dependency indices are already resolved
    pub fn from_modules(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// Modules in their current order
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Number of modules in the graph
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the graph holds no modules
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Consume the graph, yielding the module vector
    pub fn into_modules(self) -> Vec<Module> {
        self.modules
    }
}

/// Location of a module's dependency declaration file
pub fn declaration_path(root: &Path, module_path: &str, decl_rel_path: &Path) -> PathBuf {
    root.join(module_path).join(decl_rel_path)
}

#[cfg(test)]
mod tests {
    use std::fs as std_fs;

    use tempfile::TempDir;

    use super::*;
    use crate::fs::LocalFileStore;

    const DECL: &str = "Properties/dependencies.list";

    fn write_declaration(root: &Path, module: &str, deps: &[&str]) {
        let decl = root.join(module).join(DECL);
        std_fs::create_dir_all(decl.parent().unwrap()).unwrap();
        std_fs::write(&decl, deps.join("\n")).unwrap();
    }

    fn registry(entries: &[&str]) -> ModuleSet {
        let source: String = entries
            .iter()
            .map(|path| format!("{path} = https://git.example.com/{path}.git\n"))
            .collect();
        ModuleSet::parse(&source).unwrap()
    }

    #[test]
    fn resolves_names_to_registry_indices() {
        let dir = TempDir::new().unwrap();
        let set = registry(&["app", "lib"]);
        write_declaration(dir.path(), "app", &["lib"]);

        let graph =
            DependencyGraph::resolve(&set, &LocalFileStore, dir.path(), Path::new(DECL)).unwrap();
        assert_eq!(graph.modules()[0].dependencies, vec![1]);
        assert!(graph.modules()[1].dependencies.is_empty());
    }

    #[test]
    fn module_without_declaration_has_no_edges() {
        let dir = TempDir::new().unwrap();
        let set = registry(&["app"]);

        let graph =
            DependencyGraph::resolve(&set, &LocalFileStore, dir.path(), Path::new(DECL)).unwrap();
        assert!(graph.modules()[0].dependencies.is_empty());
    }

    #[test]
    fn unknown_dependency_carries_module_and_missing_name() {
        let dir = TempDir::new().unwrap();
        let set = registry(&["app", "lib"]);
        write_declaration(dir.path(), "app", &["lib", "ghost"]);

        let err = DependencyGraph::resolve(&set, &LocalFileStore, dir.path(), Path::new(DECL))
            .unwrap_err();
        match err {
            CoreError::UnknownModule { module, dependency } => {
                assert_eq!(module, "app");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected UnknownModule, got {other}"),
        }
    }

    #[test]
    fn blank_declaration_lines_are_ignored() {
        let dir = TempDir::new().unwrap();
        let set = registry(&["app", "lib"]);
        write_declaration(dir.path(), "app", &["", "  lib  ", ""]);

        let graph =
            DependencyGraph::resolve(&set, &LocalFileStore, dir.path(), Path::new(DECL)).unwrap();
        assert_eq!(graph.modules()[0].dependencies, vec![1]);
    }
}
