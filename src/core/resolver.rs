//! Dependency resolution
//!
//! Handles computing build order and detecting dependency cycles.

use std::collections::{HashMap, HashSet};

use crate::core::unit::Unit;
use crate::error::ResolverError;

/// Dependency graph for units
///
/// Traversal follows insertion order, so the computed order is stable for a
/// given unit set.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Adjacency list: unit -> dependencies
    edges: HashMap<String, Vec<String>>,
    /// All known units, in insertion order
    nodes: Vec<String>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph over `units`, keeping only edges between members
    pub fn from_units(units: &[Unit]) -> Self {
        let members: HashSet<&str> = units.iter().map(|u| u.name.as_str()).collect();
        let mut graph = Self::new();
        for unit in units {
            let deps = unit
                .deps
                .iter()
                .filter(|dep| members.contains(dep.as_str()))
                .cloned()
                .collect();
            graph.add_unit(&unit.name, deps);
        }
        graph
    }

    /// Add a unit to the graph
    pub fn add_unit(&mut self, name: &str, dependencies: Vec<String>) {
        if !self.nodes.iter().any(|n| n == name) {
            self.nodes.push(name.to_string());
        }
        for dep in &dependencies {
            if !self.nodes.contains(dep) {
                self.nodes.push(dep.clone());
            }
        }
        self.edges.insert(name.to_string(), dependencies);
    }

    /// Compute topological sort (build order)
    ///
    /// Returns units in order such that dependencies come before dependents.
    pub fn topological_sort(&self) -> Result<Vec<String>, ResolverError> {
        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::new();
        let mut cycle_path = Vec::new();

        for node in &self.nodes {
            if !visited.contains(node) {
                self.visit(
                    node,
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                    &mut cycle_path,
                )?;
            }
        }

        Ok(result)
    }

    fn visit(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        temp_visited: &mut HashSet<String>,
        result: &mut Vec<String>,
        cycle_path: &mut Vec<String>,
    ) -> Result<(), ResolverError> {
        if temp_visited.contains(node) {
            // Report only the loop itself, not the path leading into it
            let start = cycle_path.iter().position(|n| n == node).unwrap_or(0);
            let mut cycle = cycle_path[start..].to_vec();
            cycle.push(node.to_string());
            return Err(ResolverError::CircularDependency { cycle });
        }

        if visited.contains(node) {
            return Ok(());
        }

        temp_visited.insert(node.to_string());
        cycle_path.push(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                self.visit(dep, visited, temp_visited, result, cycle_path)?;
            }
        }

        cycle_path.pop();
        temp_visited.remove(node);
        visited.insert(node.to_string());
        result.push(node.to_string());

        Ok(())
    }

    /// Group units into levels: every dependency of a unit lies in an earlier level
    ///
    /// Units within one level have no dependency relationship to each other.
    pub fn levels(&self) -> Result<Vec<Vec<String>>, ResolverError> {
        let order = self.topological_sort()?;
        let mut depth: HashMap<&str, usize> = HashMap::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        for node in &order {
            let level = self
                .edges
                .get(node)
                .into_iter()
                .flatten()
                .filter_map(|dep| depth.get(dep.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(node, level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(node.clone());
        }

        Ok(levels)
    }

}

/// Order `units` so that every unit follows the units it depends on
///
/// Dependencies on names outside the set are ignored.
pub fn order_units(units: Vec<Unit>) -> Result<Vec<Unit>, ResolverError> {
    let order = DependencyGraph::from_units(&units).topological_sort()?;
    Ok(arrange(units, &order))
}

/// Group `units` into dependency levels (see [`DependencyGraph::levels`])
pub fn unit_levels(units: Vec<Unit>) -> Result<Vec<Vec<Unit>>, ResolverError> {
    let levels = DependencyGraph::from_units(&units).levels()?;
    let mut by_name: HashMap<String, Unit> =
        units.into_iter().map(|u| (u.name.clone(), u)).collect();
    Ok(levels
        .into_iter()
        .map(|level| {
            level
                .into_iter()
                .filter_map(|name| by_name.remove(&name))
                .collect()
        })
        .collect())
}

fn arrange(units: Vec<Unit>, order: &[String]) -> Vec<Unit> {
    let mut by_name: HashMap<String, Unit> =
        units.into_iter().map(|u| (u.name.clone(), u)).collect();
    order.iter().filter_map(|name| by_name.remove(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::acyclic_graph;
    use proptest::prelude::*;

    fn unit(name: &str, deps: &[&str]) -> Unit {
        Unit::new(name, format!("/src/{name}"), format!("/out/{name}")).with_deps(deps.iter().copied())
    }

    #[test]
    fn test_simple_dependency_order() {
        let mut graph = DependencyGraph::new();
        graph.add_unit("app", vec!["lib".to_string()]);
        graph.add_unit("lib", vec![]);

        let order = graph.topological_sort().unwrap();
        let lib_pos = order.iter().position(|x| x == "lib").unwrap();
        let app_pos = order.iter().position(|x| x == "app").unwrap();

        assert!(lib_pos < app_pos, "lib should be built before app");
    }

    #[test]
    fn test_circular_dependency_detection() {
        let mut graph = DependencyGraph::new();
        graph.add_unit("a", vec!["b".to_string()]);
        graph.add_unit("b", vec!["c".to_string()]);
        graph.add_unit("c", vec!["a".to_string()]);

        match graph.topological_sort() {
            Err(ResolverError::CircularDependency { cycle }) => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_order_units_ignores_external_deps() {
        let units = vec![unit("api", &["base", "cowlib"]), unit("base", &[])];
        let ordered = order_units(units).unwrap();
        let names: Vec<&str> = ordered.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["base", "api"]);
    }

    #[test]
    fn test_order_is_stable_for_independent_units() {
        let units = vec![unit("c", &[]), unit("a", &[]), unit("b", &[])];
        let ordered = order_units(units).unwrap();
        let names: Vec<&str> = ordered.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_levels_group_independent_units() {
        let units = vec![
            unit("web", &["api", "auth"]),
            unit("api", &["base"]),
            unit("auth", &["base"]),
            unit("base", &[]),
        ];
        let levels = unit_levels(units).unwrap();
        let names: Vec<Vec<&str>> = levels
            .iter()
            .map(|l| l.iter().map(|u| u.name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["base"], vec!["api", "auth"], vec!["web"]]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(crate::config::defaults::MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn prop_dependencies_precede_dependents(edges in acyclic_graph(12)) {
            let units: Vec<Unit> = edges
                .iter()
                .map(|(name, deps)| unit(name, &deps.iter().map(String::as_str).collect::<Vec<_>>()))
                .collect();
            let ordered = order_units(units).unwrap();
            prop_assert_eq!(ordered.len(), edges.len());

            let position: HashMap<&str, usize> = ordered
                .iter()
                .enumerate()
                .map(|(i, u)| (u.name.as_str(), i))
                .collect();
            for (name, deps) in &edges {
                for dep in deps {
                    prop_assert!(position[dep.as_str()] < position[name.as_str()]);
                }
            }
        }

        #[test]
        fn prop_back_edge_always_creates_cycle(edges in acyclic_graph(12)) {
            // Any existing edge a -> b plus b -> a forms a cycle
            if let Some((name, deps)) = edges.iter().find(|(_, d)| !d.is_empty()) {
                let mut units: Vec<Unit> = edges
                    .iter()
                    .map(|(n, d)| unit(n, &d.iter().map(String::as_str).collect::<Vec<_>>()))
                    .collect();
                let target = deps[0].clone();
                if let Some(dep_unit) = units.iter_mut().find(|u| u.name == target) {
                    dep_unit.deps.push(name.clone());
                }
                let is_cycle = matches!(
                    order_units(units),
                    Err(ResolverError::CircularDependency { .. })
                );
                prop_assert!(is_cycle);
            }
        }
    }
}
