//! Graph construction: input resolution and cycle detection.
//!
//! Building resolves every declared input through the registry's producer
//! index and then proves the result acyclic. Both failures are definition
//! errors surfaced to the notebook author, not execution-time conditions.

use std::collections::HashMap;

use tracing::debug;

use crate::error::GraphError;
use crate::registry::{CellId, CellRegistry, VariableName};

use super::dep_graph::DepGraph;

/// Traversal state of a cell during the cycle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    /// On the active depth-first path. Reaching such a cell again means
    /// the path closed into a cycle.
    OnPath,
    Done,
}

impl DepGraph {
    /// Derive the graph from the registry's declared inputs and outputs.
    ///
    /// Fails with [`GraphError::UnresolvedInput`] when a cell reads a
    /// variable no cell produces, and with [`GraphError::CycleDetected`]
    /// when the edges are not acyclic. The cycle payload lists the cells
    /// actually on the cycle, in edge order.
    pub fn build(registry: &CellRegistry) -> Result<Self, GraphError> {
        let cell_count = registry.len();
        let mut dependents: Vec<Vec<CellId>> = vec![Vec::new(); cell_count];
        let mut dependencies: Vec<Vec<CellId>> = vec![Vec::new(); cell_count];
        let mut consumers: HashMap<VariableName, Vec<CellId>> = HashMap::new();
        let mut producers: HashMap<VariableName, CellId> = HashMap::new();

        for (id, cell) in registry.cells() {
            for output in cell.outputs() {
                producers.insert(output.clone(), id);
            }
        }

        for (id, cell) in registry.cells() {
            for input in cell.inputs() {
                let producer = registry.producer_of(input).map_err(|_| {
                    GraphError::UnresolvedInput {
                        cell: cell.name().to_owned(),
                        variable: input.clone(),
                    }
                })?;
                dependents[producer.index()].push(id);
                dependencies[id.index()].push(producer);
                consumers.entry(input.clone()).or_default().push(id);
            }
        }

        // A consumer reading two outputs of the same producer yields the
        // edge twice; collapse it.
        for list in dependents.iter_mut().chain(dependencies.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }
        for list in consumers.values_mut() {
            list.sort_unstable();
            list.dedup();
        }

        let graph = Self {
            dependents,
            dependencies,
            consumers,
            producers,
        };
        graph.check_acyclic(registry)?;

        debug!(
            cells = cell_count,
            edges = graph.edge_count(),
            "dependency graph built"
        );
        Ok(graph)
    }

    /// Depth-first cycle check over the whole graph.
    fn check_acyclic(&self, registry: &CellRegistry) -> Result<(), GraphError> {
        let mut marks = vec![Mark::Unvisited; self.node_count()];
        let mut path: Vec<CellId> = Vec::new();

        for (id, _) in registry.cells() {
            if let Some(cycle) = self.visit(id, &mut marks, &mut path) {
                let cycle: Vec<String> = cycle
                    .into_iter()
                    .map(|id| {
                        registry
                            .get(id)
                            .map(|cell| cell.name().to_owned())
                            .unwrap_or_else(|| id.to_string())
                    })
                    .collect();
                return Err(GraphError::CycleDetected { cycle });
            }
        }
        Ok(())
    }

    /// Visit `node` depth-first, tracking the active recursion path.
    ///
    /// Returns the cycle (in edge order) if one closes through `node`'s
    /// subtree.
    fn visit(
        &self,
        node: CellId,
        marks: &mut [Mark],
        path: &mut Vec<CellId>,
    ) -> Option<Vec<CellId>> {
        match marks[node.index()] {
            Mark::Done => return None,
            Mark::OnPath => {
                // The active path closed. The cycle is the path suffix
                // starting at this node's earlier occurrence.
                let start = path
                    .iter()
                    .position(|&c| c == node)
                    .expect("on-path cell must be on the active path");
                return Some(path[start..].to_vec());
            }
            Mark::Unvisited => {}
        }

        marks[node.index()] = Mark::OnPath;
        path.push(node);

        for &next in self.dependents_of(node) {
            if let Some(cycle) = self.visit(next, marks, path) {
                return Some(cycle);
            }
        }

        path.pop();
        marks[node.index()] = Mark::Done;
        None
    }
}
