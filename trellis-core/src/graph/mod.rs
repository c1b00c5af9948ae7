//! Dependency Graph
//!
//! The graph derived from the registry's declared inputs and outputs:
//! nodes are cells, and an edge runs from cell A to cell B exactly when B
//! declares an input variable that A produces.
//!
//! # Design Decisions
//!
//! 1. The graph is a build-time artifact. It resolves every declared input
//!    through the producer index (turning a dangling name into a
//!    build-time error instead of a runtime lookup failure) and proves
//!    acyclicity before any cell runs.
//!
//! 2. Both edge directions are materialized - forward (dependents) for
//!    change propagation, reverse (dependencies) for readiness and
//!    failure-blocking checks during execution.
//!
//! 3. There is no incremental maintenance. Whenever the cell set changes,
//!    the engine throws the graph away and rebuilds it from the registry;
//!    notebooks are small enough that a full rebuild is the simpler and
//!    only supported path.

mod build;
mod dep_graph;

pub use dep_graph::DepGraph;
