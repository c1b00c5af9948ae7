//! Per-cell run states and plan outcomes.

use serde::Serialize;

use crate::error::CellError;
use crate::registry::CellId;

/// Lifecycle state of a cell, as of the last plan that touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    /// Never executed.
    Pending,

    /// Last execution succeeded; outputs are current.
    Fresh,

    /// Last execution failed; outputs kept their previous values. Stays
    /// failed until a later trigger re-runs the cell successfully.
    Failed,

    /// Skipped in the last plan because an upstream cell failed; outputs
    /// kept their previous values.
    Blocked,
}

/// One failed cell inside a run, with the underlying error.
#[derive(Debug)]
pub struct CellFailure {
    pub cell: CellId,
    pub name: String,
    pub error: CellError,
}

/// Outcome of one executed plan.
///
/// A plan always runs to completion: failures and blocked cells are
/// reported here rather than aborting the whole run, so unrelated
/// branches still make progress.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Every cell in the plan, in execution order.
    pub planned: Vec<CellId>,

    /// Cells that ran to completion.
    pub succeeded: Vec<CellId>,

    /// Cells whose body failed.
    pub failures: Vec<CellFailure>,

    /// Cells skipped because a cell upstream of them failed.
    pub blocked: Vec<CellId>,
}

impl RunReport {
    /// True when every planned cell ran successfully.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.blocked.is_empty()
    }

    pub fn first_failure(&self) -> Option<&CellFailure> {
        self.failures.first()
    }
}
