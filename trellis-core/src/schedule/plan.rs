//! Execution plans: topological ordering of the affected subgraph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::graph::DepGraph;
use crate::registry::CellId;

/// An ordered batch of cells to run in response to one trigger.
///
/// Computed fresh for every trigger; never persisted. The order is a
/// topological sort of the affected subgraph, and cells with no ordering
/// constraint between them run in registration order - so the same
/// trigger always yields the same plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    order: Vec<CellId>,
}

impl ExecutionPlan {
    /// Topologically order `affected`, honoring only edges whose both
    /// endpoints are inside the set.
    ///
    /// Kahn's algorithm with the ready set kept as a min-heap on cell id;
    /// since ids are assigned in registration order, the heap is exactly
    /// the registration-order tie-break.
    pub(crate) fn for_cells(affected: &[CellId], graph: &DepGraph) -> Self {
        let members: HashSet<CellId> = affected.iter().copied().collect();
        let mut in_degree: HashMap<CellId, usize> = HashMap::with_capacity(affected.len());
        let mut ready: BinaryHeap<Reverse<CellId>> = BinaryHeap::new();

        for &id in affected {
            let degree = graph
                .dependencies_of(id)
                .iter()
                .filter(|dep| members.contains(dep))
                .count();
            in_degree.insert(id, degree);
            if degree == 0 {
                ready.push(Reverse(id));
            }
        }

        let mut order = Vec::with_capacity(affected.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);

            for &next in graph.dependents_of(id) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.push(Reverse(next));
                    }
                }
            }
        }

        Self { order }
    }

    /// Cells in execution order.
    pub fn order(&self) -> &[CellId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
