//! Cell definitions.
//!
//! A cell is a unit of computation with a stable identity, ordered lists of
//! declared input and output variable names, and an opaque body. The body
//! is a pure function from input values to output values as far as the
//! engine is concerned; side effects such as rendering a chart are allowed
//! but invisible to the dependency graph.
//!
//! # Cell shapes
//!
//! Three shapes cover every cell the notebook host defines:
//!
//! - **Source** cells ([`Cell::source`]): no inputs, one output. These back
//!   UI inputs (sliders, text fields) - the host overwrites their value
//!   directly and triggers a change.
//!
//! - **Derived** cells ([`Cell::new`]): inputs and outputs. Ordinary
//!   computation, possibly delegating to an external engine.
//!
//! - **Sink** cells ([`Cell::sink`]): inputs but no outputs. Renderers.
//!   They are scheduled like any other cell; their side effect is the whole
//!   point.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::BodyError;

use super::variable::VariableName;

/// Identifier for a registered cell.
///
/// Assigned sequentially by the registry, so the numeric order of two ids
/// is their registration order. The scheduler relies on this for its
/// deterministic tie-break.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellId(pub(crate) u32);

impl CellId {
    /// Position of this cell in registration order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Read-only view of the resolved input values handed to a cell body.
///
/// The scheduler guarantees that every *declared* input is present before
/// the body runs; [`CellInputs::require`] can only fail for names the cell
/// never declared.
pub struct CellInputs<'a> {
    values: &'a IndexMap<VariableName, Value>,
}

impl<'a> CellInputs<'a> {
    pub(crate) fn new(values: &'a IndexMap<VariableName, Value>) -> Self {
        Self { values }
    }

    /// Value of the named input, if the cell declared it.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Value of the named input, as an error suitable for `?` in a body.
    pub fn require(&self, name: &str) -> Result<&Value, BodyError> {
        self.get(name)
            .ok_or_else(|| format!("cell did not declare input '{name}'").into())
    }

    /// Declared inputs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&VariableName, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Output values returned by a cell body, keyed by declared output name.
#[derive(Debug, Default)]
pub struct CellOutputs {
    values: IndexMap<VariableName, Value>,
}

impl CellOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for the common one-output cell.
    pub fn single(name: impl Into<VariableName>, value: impl Into<Value>) -> Self {
        let mut outputs = Self::new();
        outputs.set(name, value);
        outputs
    }

    pub fn set(&mut self, name: impl Into<VariableName>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Produced names, in the order the body set them.
    pub fn names(&self) -> impl Iterator<Item = &VariableName> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_values(self) -> IndexMap<VariableName, Value> {
        self.values
    }
}

/// The computation body of a cell.
pub type CellBody =
    Box<dyn Fn(&CellInputs<'_>) -> Result<CellOutputs, BodyError> + Send + Sync>;

/// A unit of computation with declared inputs and outputs.
///
/// Identity is immutable after registration; only the variables a cell
/// produces are ever recomputed, never the definition itself.
pub struct Cell {
    name: String,
    inputs: SmallVec<[VariableName; 4]>,
    outputs: SmallVec<[VariableName; 4]>,
    body: CellBody,
}

impl Cell {
    /// A derived cell: reads `inputs`, produces `outputs`.
    pub fn new<I, O, F>(name: impl Into<String>, inputs: I, outputs: O, body: F) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VariableName>,
        O: IntoIterator,
        O::Item: Into<VariableName>,
        F: Fn(&CellInputs<'_>) -> Result<CellOutputs, BodyError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            body: Box::new(body),
        }
    }

    /// A source cell: no inputs, one output with a default value.
    ///
    /// Backs an externally-bound input. The body only matters for the
    /// initial whole-notebook run; afterwards the host overwrites the
    /// value directly and the producer is not re-run.
    pub fn source(
        name: impl Into<String>,
        output: impl Into<VariableName>,
        initial: Value,
    ) -> Self {
        let output = output.into();
        let body_output = output.clone();
        Self::new(
            name,
            std::iter::empty::<VariableName>(),
            [output],
            move |_inputs| Ok(CellOutputs::single(body_output.clone(), initial.clone())),
        )
    }

    /// A sink cell: inputs but no outputs. The side effect (rendering) is
    /// observable by the host but does not feed the graph.
    pub fn sink<I, F>(name: impl Into<String>, inputs: I, render: F) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VariableName>,
        F: Fn(&CellInputs<'_>) -> Result<(), BodyError> + Send + Sync + 'static,
    {
        Self::new(
            name,
            inputs,
            std::iter::empty::<VariableName>(),
            move |inputs| {
                render(inputs)?;
                Ok(CellOutputs::new())
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared input variable names, in declaration order.
    pub fn inputs(&self) -> &[VariableName] {
        &self.inputs
    }

    /// Declared output variable names, in declaration order.
    pub fn outputs(&self) -> &[VariableName] {
        &self.outputs
    }

    /// Run the body against resolved input values.
    pub(crate) fn run(&self, inputs: &CellInputs<'_>) -> Result<CellOutputs, BodyError> {
        (self.body)(inputs)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}
