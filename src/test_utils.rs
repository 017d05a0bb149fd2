//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid unit name (lowercase alphanumeric with underscores)
    pub fn unit_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,20}".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate an acyclic dependency relation over up to `max` units
    ///
    /// Each unit may only depend on units with a lower index; the list is
    /// emitted dependents-first so ordering has real work to do.
    pub fn acyclic_graph(max: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
        (1..=max)
            .prop_flat_map(|n| prop::collection::vec(prop::collection::vec(any::<bool>(), n), n))
            .prop_map(|matrix| {
                let n = matrix.len();
                let mut edges: Vec<(String, Vec<String>)> = (0..n)
                    .map(|i| {
                        let deps = (0..i)
                            .filter(|&j| matrix[i][j])
                            .map(|j| format!("unit{j}"))
                            .collect();
                        (format!("unit{i}"), deps)
                    })
                    .collect();
                edges.reverse();
                edges
            })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(crate::config::defaults::MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_unit_name_generator(name in unit_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }

        #[test]
        fn test_acyclic_graph_only_points_backwards(edges in acyclic_graph(10)) {
            for (name, deps) in &edges {
                let index: usize = name.trim_start_matches("unit").parse().unwrap();
                for dep in deps {
                    let dep_index: usize = dep.trim_start_matches("unit").parse().unwrap();
                    prop_assert!(dep_index < index);
                }
            }
        }
    }
}
