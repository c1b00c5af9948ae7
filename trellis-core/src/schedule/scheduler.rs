//! Plan execution.
//!
//! The scheduler walks a plan in order, feeding each cell the current
//! values of its declared inputs and writing its outputs back with bumped
//! versions. Versions increase on every recompute even when the value is
//! unchanged by equality - the engine always re-runs the full transitive
//! set rather than pruning value-stable branches, so equality only feeds
//! a debug log line.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CellError;
use crate::graph::DepGraph;
use crate::registry::{Cell, CellId, CellInputs, CellRegistry, VariableName};

use super::plan::ExecutionPlan;
use super::report::{CellFailure, CellState, RunReport};

/// Executes plans and tracks per-cell run states across runs.
pub struct Scheduler {
    states: HashMap<CellId, CellState>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Run state of a cell. Cells no plan has touched yet are
    /// [`CellState::Pending`].
    pub fn state(&self, id: CellId) -> CellState {
        self.states.get(&id).copied().unwrap_or(CellState::Pending)
    }

    /// Execute a plan to completion.
    ///
    /// A failing body marks its cell [`CellState::Failed`] and leaves the
    /// cell's outputs untouched; dependents inside the plan become
    /// [`CellState::Blocked`] and are skipped. Cells on unrelated branches
    /// keep executing.
    pub(crate) fn run(
        &mut self,
        plan: &ExecutionPlan,
        registry: &CellRegistry,
        graph: &DepGraph,
    ) -> RunReport {
        let mut report = RunReport {
            planned: plan.order().to_vec(),
            ..Default::default()
        };
        // Cells whose outputs cannot be trusted this run: failed or
        // blocked. Anything depending on one of these is blocked too.
        let mut poisoned: HashSet<CellId> = HashSet::new();

        for &id in plan.order() {
            let Some(cell) = registry.get(id) else {
                // The plan was built from the same registry; a miss means
                // the host rebuilt state mid-run, which &mut prevents.
                warn!(id = %id, "planned cell missing from registry; skipping");
                continue;
            };

            if graph
                .dependencies_of(id)
                .iter()
                .any(|dep| poisoned.contains(dep))
            {
                self.states.insert(id, CellState::Blocked);
                poisoned.insert(id);
                report.blocked.push(id);
                warn!(cell = %cell.name(), "upstream failure; cell blocked");
                continue;
            }

            match self.execute(cell, registry) {
                Ok(()) => {
                    self.states.insert(id, CellState::Fresh);
                    report.succeeded.push(id);
                }
                Err(error) => {
                    self.states.insert(id, CellState::Failed);
                    poisoned.insert(id);
                    warn!(cell = %cell.name(), error = %error, "cell execution failed");
                    report.failures.push(CellFailure {
                        cell: id,
                        name: cell.name().to_owned(),
                        error,
                    });
                }
            }
        }

        debug!(
            planned = report.planned.len(),
            succeeded = report.succeeded.len(),
            failed = report.failures.len(),
            blocked = report.blocked.len(),
            "plan finished"
        );
        report
    }

    /// Run one cell body against the latest completed variable values.
    fn execute(&self, cell: &Cell, registry: &CellRegistry) -> Result<(), CellError> {
        let mut values: IndexMap<VariableName, Value> =
            IndexMap::with_capacity(cell.inputs().len());
        for input in cell.inputs() {
            let value = registry
                .value(input.as_str())
                .ok_or_else(|| CellError::UnsetInput(input.clone()))?;
            values.insert(input.clone(), value);
        }

        let inputs = CellInputs::new(&values);
        let outputs = cell.run(&inputs).map_err(CellError::Body)?;

        // Enforce the output contract before writing anything back, so a
        // misbehaving body cannot leave the table half-updated.
        for declared in cell.outputs() {
            if outputs.get(declared.as_str()).is_none() {
                return Err(CellError::MissingOutput(declared.clone()));
            }
        }
        for produced in outputs.names() {
            if !cell.outputs().contains(produced) {
                return Err(CellError::UndeclaredOutput(produced.clone()));
            }
        }

        for (name, version, changed) in registry.write_outputs(outputs) {
            debug!(variable = %name, version, changed, "output written");
        }
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
