//! Error types for the reactive engine.
//!
//! Errors fall into two families with very different lifetimes:
//!
//! - [`GraphError`]: structural problems in the cell definitions themselves
//!   (duplicate producers, dangling inputs, cycles). These are raised at
//!   registration or build time, are fatal to loading the notebook, and are
//!   never recovered automatically - the author has to fix the definition.
//!
//! - [`CellError`]: per-cell failures during a scheduled run (a body raised,
//!   an input had no value yet, a body broke its output contract). These are
//!   isolated to the failing cell and its dependents and clear on the next
//!   successful run of that cell.

use thiserror::Error;

use crate::registry::VariableName;

/// Opaque error produced by a cell body.
///
/// Bodies delegate to arbitrary external collaborators (query engines,
/// renderers), so the engine does not constrain their error type beyond
/// being displayable and sendable.
pub type BodyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structural errors in the cell graph definition.
///
/// All of these indicate a malformed notebook and are surfaced to the
/// author; none of them can occur once [`crate::graph::DepGraph::build`]
/// has succeeded for the current cell set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two cells declared the same output variable. Each variable has
    /// exactly one producer.
    #[error("variable '{variable}' is already produced by cell '{existing}'; cell '{attempted}' cannot produce it too")]
    DuplicateOutput {
        variable: VariableName,
        existing: String,
        attempted: String,
    },

    /// A variable name was looked up that no registered cell produces.
    #[error("no registered cell produces variable '{variable}'")]
    NoProducer { variable: VariableName },

    /// A cell declared an input that no cell produces. Detected at build
    /// time so that cells may be registered in any order.
    #[error("cell '{cell}' reads variable '{variable}', which no registered cell produces")]
    UnresolvedInput {
        cell: String,
        variable: VariableName,
    },

    /// The declared inputs/outputs form a cycle. The payload is the full
    /// cycle in edge order, for diagnostics.
    #[error("dependency cycle between cells: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },
}

/// A failure of one cell during a scheduled run.
///
/// The failing cell's outputs keep their previous values and versions;
/// dependents in the same plan are skipped rather than executed against
/// half-updated state.
#[derive(Debug, Error)]
pub enum CellError {
    /// The cell body returned an error.
    #[error("body returned an error: {0}")]
    Body(BodyError),

    /// A declared input has never been computed. Happens when a change is
    /// triggered before the initial whole-notebook run has populated the
    /// variable.
    #[error("input variable '{0}' has no value yet")]
    UnsetInput(VariableName),

    /// The body completed but did not produce one of the cell's declared
    /// outputs.
    #[error("body did not produce declared output '{0}'")]
    MissingOutput(VariableName),

    /// The body produced a variable the cell never declared. Writing it
    /// would bypass the single-producer invariant, so the run is rejected
    /// as a whole.
    #[error("body produced undeclared output '{0}'")]
    UndeclaredOutput(VariableName),
}
