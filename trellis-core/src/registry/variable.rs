//! Variable names and value slots.
//!
//! A variable is a named value owned by exactly one producing cell. The
//! slot stores the current value (or nothing, before the first run) and a
//! version counter that increases on every recompute - the version tracks
//! "recomputed", not "changed", so dependents always observe a new version
//! after their upstream ran, even when the value is equal to the old one.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of a variable, as declared in a cell's input/output lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableName(String);

impl VariableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariableName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for VariableName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// Allows map lookups keyed by VariableName to accept plain &str.
impl Borrow<str> for VariableName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Current state of one variable: value plus recompute counter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Variable {
    value: Option<Value>,
    version: u64,
}

impl Variable {
    /// An unset slot, as created at registration time. Version 0 means
    /// "never computed".
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Store a new value and bump the version.
    ///
    /// Returns `true` when the new value differs from the previous one by
    /// equality. The version increases either way.
    pub(crate) fn write(&mut self, value: Value) -> bool {
        let changed = self.value.as_ref() != Some(&value);
        self.value = Some(value);
        self.version += 1;
        changed
    }
}

/// One row of a registry snapshot: everything a host needs to re-render a
/// bound view of the variable.
#[derive(Debug, Clone, Serialize)]
pub struct VariableSnapshot {
    pub name: VariableName,
    pub value: Option<Value>,
    pub version: u64,
}
