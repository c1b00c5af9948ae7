//! The cell registry.
//!
//! The registry holds every registered cell in registration order, the
//! producer index mapping each variable name to its owning cell, and the
//! variable-value table.
//!
//! # Invariants
//!
//! 1. A variable has at most one producer. Violations are rejected at
//!    registration with [`GraphError::DuplicateOutput`].
//!
//! 2. Inputs are *not* checked at registration - a cell may reference a
//!    variable whose producer registers later. Dangling references surface
//!    at graph build time instead, which keeps registration order-free.
//!
//! 3. The variable table is the only shared mutable state in the engine.
//!    During a scheduled run only the scheduler writes to it, and only
//!    between cell executions; the host writes through
//!    [`CellRegistry::set_value`] when binding a new UI input value, while
//!    no plan is running.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::GraphError;

use super::cell::{Cell, CellId, CellOutputs};
use super::variable::{Variable, VariableName, VariableSnapshot};

/// All registered cells plus the current variable values.
pub struct CellRegistry {
    /// Cells in registration order; a cell's id is its index here.
    cells: Vec<Cell>,

    /// Owning cell for every declared output variable.
    producers: HashMap<VariableName, CellId>,

    /// Current value and version of every declared output variable.
    /// Declaration-ordered so snapshots render stably.
    variables: RwLock<IndexMap<VariableName, Variable>>,
}

impl CellRegistry {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            producers: HashMap::new(),
            variables: RwLock::new(IndexMap::new()),
        }
    }

    /// Register a cell, assigning it the next id.
    ///
    /// Fails with [`GraphError::DuplicateOutput`] if any declared output is
    /// already produced by a registered cell (or twice by this one).
    pub fn register(&mut self, cell: Cell) -> Result<CellId, GraphError> {
        let id = CellId(self.cells.len() as u32);

        // Validate every output before touching any index, so a rejected
        // cell leaves the registry untouched.
        for (i, output) in cell.outputs().iter().enumerate() {
            if let Some(&existing) = self.producers.get(output) {
                return Err(GraphError::DuplicateOutput {
                    variable: output.clone(),
                    existing: self.cells[existing.index()].name().to_owned(),
                    attempted: cell.name().to_owned(),
                });
            }
            // One cell declaring the same output twice is a producer
            // conflict with itself.
            if cell.outputs()[..i].contains(output) {
                return Err(GraphError::DuplicateOutput {
                    variable: output.clone(),
                    existing: cell.name().to_owned(),
                    attempted: cell.name().to_owned(),
                });
            }
        }

        {
            let mut variables = self.variables.write();
            for output in cell.outputs() {
                self.producers.insert(output.clone(), id);
                variables.insert(output.clone(), Variable::unset());
            }
        }

        debug!(
            cell = %cell.name(),
            id = %id,
            inputs = cell.inputs().len(),
            outputs = cell.outputs().len(),
            "registered cell"
        );

        self.cells.push(cell);
        Ok(id)
    }

    /// The cell that owns the named variable.
    pub fn producer_of(&self, name: &VariableName) -> Result<CellId, GraphError> {
        self.producers
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::NoProducer {
                variable: name.clone(),
            })
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.index())
    }

    /// All registered cells in registration order.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (CellId(i as u32), cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Current value of a variable, if it has been computed.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.variables
            .read()
            .get(name)
            .and_then(|slot| slot.value().cloned())
    }

    /// Current version of a variable. `Some(0)` means registered but never
    /// computed; `None` means unknown variable.
    pub fn version(&self, name: &str) -> Option<u64> {
        self.variables.read().get(name).map(|slot| slot.version())
    }

    /// Host-side write for an externally-bound variable (a widget pushed a
    /// new value). Bumps the version; does not trigger any recomputation -
    /// the host follows up with an `on_change` call.
    pub fn set_value(
        &self,
        name: impl Into<VariableName>,
        value: impl Into<Value>,
    ) -> Result<u64, GraphError> {
        let name = name.into();
        let mut variables = self.variables.write();
        match variables.get_mut(name.as_str()) {
            Some(slot) => {
                let changed = slot.write(value.into());
                let version = slot.version();
                debug!(variable = %name, version, changed, "host wrote variable");
                Ok(version)
            }
            None => Err(GraphError::NoProducer { variable: name }),
        }
    }

    /// Scheduler-side write-back of a completed cell's outputs.
    ///
    /// Every output version is bumped, including value-unchanged ones.
    /// Returns `(name, version, changed)` per output for logging.
    pub(crate) fn write_outputs(
        &self,
        outputs: CellOutputs,
    ) -> Vec<(VariableName, u64, bool)> {
        let mut variables = self.variables.write();
        outputs
            .into_values()
            .into_iter()
            .filter_map(|(name, value)| {
                let slot = variables.get_mut(name.as_str())?;
                let changed = slot.write(value);
                let version = slot.version();
                Some((name, version, changed))
            })
            .collect()
    }

    /// Declaration-ordered snapshot of every variable, for host rendering
    /// or persistence.
    pub fn snapshot(&self) -> Vec<VariableSnapshot> {
        self.variables
            .read()
            .iter()
            .map(|(name, slot)| VariableSnapshot {
                name: name.clone(),
                value: slot.value().cloned(),
                version: slot.version(),
            })
            .collect()
    }
}

impl Default for CellRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CellRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellRegistry")
            .field("cells", &self.cells.len())
            .field("variables", &self.variables.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(name: &str, var: &str) -> Cell {
        Cell::source(name, var, json!(0))
    }

    #[test]
    fn register_assigns_sequential_ids() {
        let mut registry = CellRegistry::new();

        let a = registry.register(source("a", "x")).unwrap();
        let b = registry.register(source("b", "y")).unwrap();

        assert_eq!(a, CellId(0));
        assert_eq!(b, CellId(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_output_is_rejected() {
        let mut registry = CellRegistry::new();
        registry.register(source("first", "x")).unwrap();

        let err = registry.register(source("second", "x")).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DuplicateOutput { ref variable, ref existing, ref attempted }
                if variable.as_str() == "x" && existing == "first" && attempted == "second"
        ));
    }

    #[test]
    fn same_cell_declaring_output_twice_is_rejected() {
        let mut registry = CellRegistry::new();
        let cell = Cell::new("twice", std::iter::empty::<VariableName>(), ["x", "x"], |_| {
            Ok(CellOutputs::single("x", json!(1)))
        });

        assert!(matches!(
            registry.register(cell),
            Err(GraphError::DuplicateOutput { .. })
        ));
    }

    #[test]
    fn producer_lookup() {
        let mut registry = CellRegistry::new();
        let id = registry.register(source("a", "x")).unwrap();

        assert_eq!(registry.producer_of(&"x".into()).unwrap(), id);
        assert!(matches!(
            registry.producer_of(&"missing".into()),
            Err(GraphError::NoProducer { .. })
        ));
    }

    #[test]
    fn dangling_inputs_are_allowed_at_registration() {
        let mut registry = CellRegistry::new();
        // "n" has no producer yet; only the graph build rejects that.
        let cell = Cell::new("early", ["n"], ["m"], |_| {
            Ok(CellOutputs::single("m", json!(0)))
        });
        assert!(registry.register(cell).is_ok());
    }

    #[test]
    fn set_value_bumps_version() {
        let mut registry = CellRegistry::new();
        registry.register(source("a", "x")).unwrap();

        assert_eq!(registry.version("x"), Some(0));
        assert_eq!(registry.value("x"), None);

        let v1 = registry.set_value("x", json!(10)).unwrap();
        assert_eq!(v1, 1);
        assert_eq!(registry.value("x"), Some(json!(10)));

        let v2 = registry.set_value("x", json!(10)).unwrap();
        assert_eq!(v2, 2);
    }

    #[test]
    fn set_value_unknown_variable_fails() {
        let registry = CellRegistry::new();
        assert!(matches!(
            registry.set_value("ghost", json!(1)),
            Err(GraphError::NoProducer { .. })
        ));
    }

    #[test]
    fn snapshot_is_declaration_ordered() {
        let mut registry = CellRegistry::new();
        registry.register(source("b", "beta")).unwrap();
        registry.register(source("a", "alpha")).unwrap();
        registry.set_value("alpha", json!(1)).unwrap();

        let snapshot = registry.snapshot();
        let names: Vec<&str> = snapshot.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["beta", "alpha"]);
        assert_eq!(snapshot[1].value, Some(json!(1)));
        assert_eq!(snapshot[1].version, 1);
        assert_eq!(snapshot[0].version, 0);
    }
}
