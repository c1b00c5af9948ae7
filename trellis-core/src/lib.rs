//! Trellis Core
//!
//! This crate provides the reactive engine at the heart of the Trellis
//! notebook runtime. Notebook cells declare which variables they read and
//! which they produce; the engine derives the dependency graph from those
//! declarations and, whenever an externally-bound variable changes (a
//! slider moved, a text field edited), re-executes exactly the downstream
//! cells, in dependency order.
//!
//! # Architecture
//!
//! Three components, layered strictly:
//!
//! - [`registry`]: cells, variable names, the producer index, and the
//!   variable-value table. Leaf component.
//! - [`graph`]: the dependency graph derived from declared inputs/outputs,
//!   with build-time resolution and cycle detection.
//! - [`schedule`]: execution plans (topological order with a
//!   registration-order tie-break) and the scheduler that runs them with
//!   per-cell failure isolation.
//!
//! [`Engine`] wires the three together; the host owns one engine per
//! notebook session.
//!
//! The engine deliberately owns nothing else: SQL execution, chart
//! rendering, and dataset loading happen inside opaque cell bodies, which
//! the engine schedules but never inspects.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use trellis_core::{Cell, CellOutputs, Engine};
//!
//! let mut engine = Engine::new();
//!
//! engine
//!     .register(Cell::source("number", "number", json!(50)))
//!     .unwrap();
//! engine
//!     .register(Cell::new("squared", ["number"], ["squared"], |inputs| {
//!         let n = inputs.require("number")?.as_i64().unwrap_or(0);
//!         Ok(CellOutputs::single("squared", json!(n * n)))
//!     }))
//!     .unwrap();
//!
//! // Initial whole-notebook run, as at load time.
//! engine.run_all().unwrap();
//! assert_eq!(engine.value("squared"), Some(json!(2500)));
//!
//! // A widget pushes a new value, then triggers the change.
//! engine.set_input("number", json!(7)).unwrap();
//! let report = engine.on_change(["number"]).unwrap();
//!
//! assert!(report.is_clean());
//! assert_eq!(engine.value("squared"), Some(json!(49)));
//! ```

pub mod engine;
pub mod error;
pub mod graph;
pub mod registry;
pub mod schedule;

pub use engine::Engine;
pub use error::{BodyError, CellError, GraphError};
pub use graph::DepGraph;
pub use registry::{
    Cell, CellBody, CellId, CellInputs, CellOutputs, CellRegistry, Variable,
    VariableName, VariableSnapshot,
};
pub use schedule::{CellFailure, CellState, ExecutionPlan, RunReport, Scheduler};
