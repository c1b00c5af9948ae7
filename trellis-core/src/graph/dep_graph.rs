//! Graph structure and change propagation queries.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::GraphError;
use crate::registry::{CellId, VariableName};

/// The dependency graph over registered cells.
///
/// Built from a registry snapshot by [`DepGraph::build`]; immutable
/// afterwards. Cell ids index directly into the adjacency tables because
/// the registry assigns them densely in registration order.
pub struct DepGraph {
    /// Forward edges: for each cell, the cells that consume one of its
    /// outputs. Sorted, deduplicated.
    pub(super) dependents: Vec<Vec<CellId>>,

    /// Reverse edges: for each cell, the cells producing its inputs.
    /// Sorted, deduplicated.
    pub(super) dependencies: Vec<Vec<CellId>>,

    /// Cells that declare each variable as an input.
    pub(super) consumers: HashMap<VariableName, Vec<CellId>>,

    /// Owning cell of each variable, snapshotted at build time.
    pub(super) producers: HashMap<VariableName, CellId>,
}

impl DepGraph {
    /// Cells consuming any output of `id`.
    pub fn dependents_of(&self, id: CellId) -> &[CellId] {
        self.dependents
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cells producing any input of `id`.
    pub fn dependencies_of(&self, id: CellId) -> &[CellId] {
        self.dependencies
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.dependents.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependents.iter().map(Vec::len).sum()
    }

    /// The cells that must re-execute when the given variables receive new
    /// values.
    ///
    /// Seeds are the consumers of each changed variable; the closure then
    /// follows producer->consumer edges. The producers of the changed
    /// variables themselves are not included - their values were just
    /// supplied, not invalidated - unless a producer also consumes one of
    /// the changed variables, in which case it is seeded like any other
    /// consumer.
    ///
    /// The result is sorted by cell id, i.e. registration order.
    pub fn downstream_of(&self, changed: &[VariableName]) -> Result<Vec<CellId>, GraphError> {
        let mut affected: HashSet<CellId> = HashSet::new();
        let mut queue: VecDeque<CellId> = VecDeque::new();

        for name in changed {
            if !self.producers.contains_key(name.as_str()) {
                return Err(GraphError::NoProducer {
                    variable: name.clone(),
                });
            }
            let seeds = self
                .consumers
                .get(name.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for &consumer in seeds {
                if affected.insert(consumer) {
                    queue.push_back(consumer);
                }
            }
        }

        // BFS over forward edges.
        while let Some(id) = queue.pop_front() {
            for &next in self.dependents_of(id) {
                if affected.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let mut result: Vec<CellId> = affected.into_iter().collect();
        result.sort_unstable();
        Ok(result)
    }
}

impl std::fmt::Debug for DepGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepGraph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Cell, CellOutputs, CellRegistry};
    use serde_json::json;

    fn passthrough(name: &str, inputs: &[&str], outputs: &[&str]) -> Cell {
        let outs: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
        Cell::new(
            name,
            inputs.iter().copied(),
            outputs.iter().copied(),
            move |_| {
                let mut result = CellOutputs::new();
                for out in &outs {
                    result.set(out.as_str(), json!(null));
                }
                Ok(result)
            },
        )
    }

    fn chain_registry() -> CellRegistry {
        // number -> squared -> display, plus an unrelated pair.
        let mut registry = CellRegistry::new();
        registry
            .register(Cell::source("number", "number", json!(1)))
            .unwrap();
        registry
            .register(passthrough("squared", &["number"], &["squared"]))
            .unwrap();
        registry
            .register(Cell::sink("display", ["squared"], |_| Ok(())))
            .unwrap();
        registry
            .register(Cell::source("other", "other", json!(0)))
            .unwrap();
        registry
            .register(Cell::sink("other_view", ["other"], |_| Ok(())))
            .unwrap();
        registry
    }

    #[test]
    fn downstream_follows_transitive_consumers() {
        let registry = chain_registry();
        let graph = DepGraph::build(&registry).unwrap();

        let affected = graph.downstream_of(&["number".into()]).unwrap();
        assert_eq!(affected, vec![CellId(1), CellId(2)]);
    }

    #[test]
    fn downstream_excludes_the_changed_variables_producer() {
        let registry = chain_registry();
        let graph = DepGraph::build(&registry).unwrap();

        let affected = graph.downstream_of(&["number".into()]).unwrap();
        assert!(!affected.contains(&CellId(0)));
    }

    #[test]
    fn downstream_does_not_leak_into_unrelated_chains() {
        let registry = chain_registry();
        let graph = DepGraph::build(&registry).unwrap();

        let affected = graph.downstream_of(&["number".into()]).unwrap();
        assert!(!affected.contains(&CellId(3)));
        assert!(!affected.contains(&CellId(4)));
    }

    #[test]
    fn producer_consuming_a_changed_variable_is_included() {
        // scale consumes "number" and produces "scaled"; when both change
        // in one batch, scale is seeded as a consumer of "number" even
        // though it produces the other changed variable.
        let mut registry = CellRegistry::new();
        registry
            .register(Cell::source("number", "number", json!(1)))
            .unwrap();
        registry
            .register(passthrough("scale", &["number"], &["scaled"]))
            .unwrap();
        let graph = DepGraph::build(&registry).unwrap();

        let affected = graph
            .downstream_of(&["number".into(), "scaled".into()])
            .unwrap();
        assert_eq!(affected, vec![CellId(1)]);

        // Changed alone, "scaled" does not re-run its own producer.
        let affected = graph.downstream_of(&["scaled".into()]).unwrap();
        assert!(affected.is_empty());
    }

    #[test]
    fn downstream_of_unknown_variable_fails() {
        let registry = chain_registry();
        let graph = DepGraph::build(&registry).unwrap();

        assert!(matches!(
            graph.downstream_of(&["ghost".into()]),
            Err(GraphError::NoProducer { .. })
        ));
    }

    #[test]
    fn batch_of_changes_unions_both_chains() {
        let registry = chain_registry();
        let graph = DepGraph::build(&registry).unwrap();

        let affected = graph
            .downstream_of(&["number".into(), "other".into()])
            .unwrap();
        assert_eq!(affected, vec![CellId(1), CellId(2), CellId(4)]);
    }
}
