//! Engine facade.
//!
//! The engine wires the three components together: the registry that holds
//! cell definitions and variable values, the dependency graph derived from
//! them, and the scheduler that executes plans. The host creates one
//! engine per notebook session and owns it; there is no process-wide
//! runtime.
//!
//! # How a change flows
//!
//! 1. A widget pushes its new value with [`Engine::set_input`].
//!
//! 2. The host calls [`Engine::on_change`] with the variable names that
//!    moved (several at once, if it coalesced near-simultaneous input).
//!
//! 3. The graph yields the downstream cell set, the scheduler orders it
//!    topologically and runs it, and the report says what happened.
//!
//! Mutating entry points take `&mut self`, so exactly one plan runs to
//! completion before another is accepted - cell bodies never observe a
//! half-updated variable table.

use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::DepGraph;
use crate::registry::{Cell, CellId, CellRegistry, VariableName, VariableSnapshot};
use crate::schedule::{CellState, ExecutionPlan, RunReport, Scheduler};

/// A notebook session's reactive engine.
pub struct Engine {
    registry: CellRegistry,
    /// Derived graph; dropped whenever the cell set changes and rebuilt in
    /// full on the next trigger.
    graph: Option<DepGraph>,
    scheduler: Scheduler,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: CellRegistry::new(),
            graph: None,
            scheduler: Scheduler::new(),
        }
    }

    /// Register a cell. Structural errors (a second producer for a
    /// variable) are rejected here; dangling inputs surface at build time.
    pub fn register(&mut self, cell: Cell) -> Result<CellId, GraphError> {
        self.graph = None;
        self.registry.register(cell)
    }

    /// Build (or rebuild) the dependency graph for the current cell set.
    ///
    /// Idempotent; [`Engine::on_change`] and [`Engine::run_all`] call this
    /// on demand, so an explicit call is only needed to validate a
    /// notebook definition eagerly at load time.
    pub fn build(&mut self) -> Result<(), GraphError> {
        if self.graph.is_none() {
            self.graph = Some(DepGraph::build(&self.registry)?);
        }
        Ok(())
    }

    /// Write a new value for an externally-bound variable.
    ///
    /// Returns the variable's new version. Does not recompute anything;
    /// follow up with [`Engine::on_change`].
    pub fn set_input(
        &mut self,
        name: impl Into<VariableName>,
        value: impl Into<Value>,
    ) -> Result<u64, GraphError> {
        self.registry.set_value(name, value)
    }

    /// React to one or more changed variables.
    ///
    /// Re-executes the full downstream set in topological order, even if
    /// the new values equal the old ones - determinism over incremental
    /// cleverness. Per-cell failures land in the report; the `Err` side is
    /// reserved for structural problems (unknown variable, cycle
    /// introduced by a re-registration).
    pub fn on_change<I>(&mut self, changed: I) -> Result<RunReport, GraphError>
    where
        I: IntoIterator,
        I::Item: Into<VariableName>,
    {
        let changed: IndexSet<VariableName> =
            changed.into_iter().map(Into::into).collect();
        let changed: Vec<VariableName> = changed.into_iter().collect();

        self.build()?;
        let graph = self.graph.as_ref().expect("graph built above");

        let affected = graph.downstream_of(&changed)?;
        let plan = ExecutionPlan::for_cells(&affected, graph);
        debug!(
            changed = changed.len(),
            affected = plan.len(),
            "change triggered"
        );
        Ok(self.scheduler.run(&plan, &self.registry, graph))
    }

    /// Execute every cell once, in topological order.
    ///
    /// This is the initial whole-notebook run at load time: it populates
    /// every variable (source cells produce their defaults) so that later
    /// triggers never see unset inputs.
    pub fn run_all(&mut self) -> Result<RunReport, GraphError> {
        self.build()?;
        let graph = self.graph.as_ref().expect("graph built above");

        let all: Vec<CellId> = self.registry.cells().map(|(id, _)| id).collect();
        let plan = ExecutionPlan::for_cells(&all, graph);
        debug!(cells = plan.len(), "full notebook run");
        Ok(self.scheduler.run(&plan, &self.registry, graph))
    }

    /// Current value of a variable, if computed.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.registry.value(name)
    }

    /// Current version of a variable; 0 means never computed.
    pub fn version(&self, name: &str) -> Option<u64> {
        self.registry.version(name)
    }

    /// Run state of a cell.
    pub fn cell_state(&self, id: CellId) -> CellState {
        self.scheduler.state(id)
    }

    /// Declaration-ordered snapshot of every variable.
    pub fn snapshot(&self) -> Vec<VariableSnapshot> {
        self.registry.snapshot()
    }

    pub fn registry(&self) -> &CellRegistry {
        &self.registry
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CellOutputs;
    use serde_json::json;

    fn squared_cell() -> Cell {
        Cell::new("squared", ["number"], ["squared"], |inputs| {
            let n = inputs.require("number")?.as_i64().unwrap_or(0);
            Ok(CellOutputs::single("squared", json!(n * n)))
        })
    }

    #[test]
    fn run_all_populates_every_variable() {
        let mut engine = Engine::new();
        engine
            .register(Cell::source("number", "number", json!(5)))
            .unwrap();
        engine.register(squared_cell()).unwrap();

        let report = engine.run_all().unwrap();
        assert!(report.is_clean());
        assert_eq!(engine.value("number"), Some(json!(5)));
        assert_eq!(engine.value("squared"), Some(json!(25)));
    }

    #[test]
    fn on_change_recomputes_downstream_only() {
        let mut engine = Engine::new();
        let number = engine
            .register(Cell::source("number", "number", json!(5)))
            .unwrap();
        let squared = engine.register(squared_cell()).unwrap();
        engine.run_all().unwrap();

        engine.set_input("number", json!(7)).unwrap();
        let report = engine.on_change(["number"]).unwrap();

        assert_eq!(report.planned, vec![squared]);
        assert!(!report.planned.contains(&number));
        assert_eq!(engine.value("squared"), Some(json!(49)));
        // The host-written value survives; the source body did not re-run.
        assert_eq!(engine.value("number"), Some(json!(7)));
    }

    #[test]
    fn registering_after_build_triggers_a_rebuild() {
        let mut engine = Engine::new();
        engine
            .register(Cell::source("number", "number", json!(1)))
            .unwrap();
        engine.build().unwrap();

        engine.register(squared_cell()).unwrap();
        engine.run_all().unwrap();

        engine.set_input("number", json!(3)).unwrap();
        let report = engine.on_change(["number"]).unwrap();
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(engine.value("squared"), Some(json!(9)));
    }

    #[test]
    fn structural_errors_surface_on_trigger_after_bad_registration() {
        let mut engine = Engine::new();
        engine
            .register(Cell::source("a", "a", json!(1)))
            .unwrap();
        engine
            .register(Cell::new("dangling", ["ghost"], ["b"], |_| {
                Ok(CellOutputs::single("b", json!(0)))
            }))
            .unwrap();

        assert!(matches!(
            engine.on_change(["a"]),
            Err(GraphError::UnresolvedInput { .. })
        ));
    }

    #[test]
    fn duplicate_change_names_are_coalesced() {
        let mut engine = Engine::new();
        engine
            .register(Cell::source("number", "number", json!(2)))
            .unwrap();
        engine.register(squared_cell()).unwrap();
        engine.run_all().unwrap();

        let before = engine.version("squared").unwrap();
        engine.set_input("number", json!(3)).unwrap();
        engine.on_change(["number", "number"]).unwrap();

        // One recompute, not two.
        assert_eq!(engine.version("squared").unwrap(), before + 1);
    }

    #[test]
    fn cell_state_is_visible_to_the_host() {
        let mut engine = Engine::new();
        let id = engine
            .register(Cell::source("x", "x", json!(0)))
            .unwrap();

        assert_eq!(engine.cell_state(id), CellState::Pending);
        engine.run_all().unwrap();
        assert_eq!(engine.cell_state(id), CellState::Fresh);
    }
}
