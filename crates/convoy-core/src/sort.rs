//! Topological ordering of the dependency graph

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::graph::DependencyGraph;

/// Reorder the graph so every dependency precedes its dependents.
///
/// Iterative multi-pass algorithm: each pass scans the pending modules in
/// their current order and moves those whose dependencies are all placed.
/// Ties among simultaneously-eligible modules preserve original registry
/// order. A module listing itself fails with [`CoreError::SelfReference`];
/// a pass that makes no progress fails with [`CoreError::CircularDependency`]
/// reporting the unresolved subset and the partial order found.
///
/// On success the module vector is re-permuted into the new order and every
/// dependency index is remapped accordingly.
pub fn sort(graph: DependencyGraph) -> Result<DependencyGraph> {
    let modules = graph.into_modules();

    let mut pending: Vec<usize> = (0..modules.len()).collect();
    let mut ordered: Vec<usize> = Vec::with_capacity(modules.len());
    let mut placed = vec![false; modules.len()];

    while !pending.is_empty() {
        let mut progressed = false;
        let mut still_pending = Vec::with_capacity(pending.len());

        for index in pending {
            let module = &modules[index];

            if module.dependencies.contains(&index) {
                return Err(CoreError::SelfReference { module: module.path.clone() });
            }

            if module.dependencies.iter().all(|&dep| placed[dep]) {
                ordered.push(index);
                placed[index] = true;
                progressed = true;
            } else {
                still_pending.push(index);
            }
        }

        if !progressed {
            return Err(CoreError::CircularDependency {
                unresolved: still_pending
                    .iter()
                    .map(|&i| modules[i].path.clone())
                    .collect(),
                resolved: ordered.iter().map(|&i| modules[i].path.clone()).collect(),
            });
        }

        pending = still_pending;
    }

    debug!("Computed build order over {} modules", ordered.len());

    // Remap: new_position[old_index] gives where each module landed
    let mut new_position = vec![0usize; modules.len()];
    for (position, &old_index) in ordered.iter().enumerate() {
        new_position[old_index] = position;
    }

    let mut by_old_index: Vec<Option<crate::registry::Module>> =
        modules.into_iter().map(Some).collect();
    let reordered = ordered
        .iter()
        .map(|&old_index| {
            let mut module = by_old_index[old_index].take().expect("each index moved once");
            for dep in &mut module.dependencies {
                *dep = new_position[*dep];
            }
            module
        })
        .collect();

    Ok(DependencyGraph::from_modules(reordered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Module;

    fn module(path: &str, dependencies: Vec<usize>) -> Module {
        Module {
            path: path.to_string(),
            repo_url: format!("https://git.example.com/{path}.git"),
            dependencies,
        }
    }

    fn paths(graph: &DependencyGraph) -> Vec<&str> {
        graph.modules().iter().map(|m| m.path.as_str()).collect()
    }

    /// Every dependency index must point at an earlier position
    fn assert_valid_order(graph: &DependencyGraph) {
        for (position, module) in graph.modules().iter().enumerate() {
            for &dep in &module.dependencies {
                assert!(
                    dep < position,
                    "{} at {position} depends on index {dep} which does not precede it",
                    module.path
                );
            }
        }
    }

    #[test]
    fn dependency_precedes_dependent() {
        let graph = DependencyGraph::from_modules(vec![
            module("moduleB", vec![1]),
            module("moduleA", vec![]),
        ]);

        let sorted = sort(graph).unwrap();
        assert_eq!(paths(&sorted), vec!["moduleA", "moduleB"]);
        assert_valid_order(&sorted);
    }

    #[test]
    fn output_is_valid_permutation_of_acyclic_graph() {
        let graph = DependencyGraph::from_modules(vec![
            module("ui", vec![1, 2]),
            module("domain", vec![3]),
            module("adapters", vec![3]),
            module("kernel", vec![]),
            module("tools", vec![0]),
        ]);

        let sorted = sort(graph).unwrap();
        assert_eq!(sorted.len(), 5);
        let mut names = paths(&sorted);
        names.sort();
        assert_eq!(names, vec!["adapters", "domain", "kernel", "tools", "ui"]);
        assert_valid_order(&sorted);
    }

    #[test]
    fn eligible_ties_keep_registry_order() {
        let graph = DependencyGraph::from_modules(vec![
            module("zeta", vec![]),
            module("alpha", vec![]),
            module("mid", vec![0]),
        ]);

        let sorted = sort(graph).unwrap();
        assert_eq!(paths(&sorted), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn self_reference_is_fatal_independent_of_other_modules() {
        let graph = DependencyGraph::from_modules(vec![
            module("fine", vec![]),
            module("selfish", vec![1]),
        ]);

        let err = sort(graph).unwrap_err();
        match err {
            CoreError::SelfReference { module } => assert_eq!(module, "selfish"),
            other => panic!("expected SelfReference, got {other}"),
        }
    }

    #[test]
    fn two_module_cycle_reports_exactly_both() {
        let graph = DependencyGraph::from_modules(vec![
            module("A", vec![1]),
            module("B", vec![0]),
            module("free", vec![]),
        ]);

        let err = sort(graph).unwrap_err();
        match err {
            CoreError::CircularDependency { unresolved, resolved } => {
                assert_eq!(unresolved, vec!["A".to_string(), "B".to_string()]);
                assert_eq!(resolved, vec!["free".to_string()]);
            }
            other => panic!("expected CircularDependency, got {other}"),
        }
    }

    #[test]
    fn sorting_a_sorted_graph_is_idempotent() {
        let graph = DependencyGraph::from_modules(vec![
            module("app", vec![1]),
            module("lib", vec![]),
            module("site", vec![0, 1]),
        ]);

        let once = sort(graph).unwrap();
        let twice = sort(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn dependency_indices_are_remapped_to_new_positions() {
        let graph = DependencyGraph::from_modules(vec![
            module("top", vec![2]),
            module("free", vec![]),
            module("base", vec![]),
        ]);

        let sorted = sort(graph).unwrap();
        assert_eq!(paths(&sorted), vec!["free", "base", "top"]);
        assert_eq!(sorted.modules()[2].dependencies, vec![1]);
    }
}
