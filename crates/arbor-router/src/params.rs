//! Request-scoped parameter context
//!
//! The matcher only ever appends to a [`Params`]. Backtracking takes a
//! [`Mark`] before trying a branch and restores it when the branch fails, so a
//! dead end never leaves captures behind.

use smallvec::SmallVec;
use std::collections::HashMap;

/// Position in the capture log, see [`Params::mark`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Captured path parameters as an append-only `(name, value)` log
///
/// Names keep their leading colon (`":id"`, `":splat"`). A later write of the
/// same name shadows the earlier one.
///
/// # Example
/// ```
/// use arbor_router::Params;
///
/// let mut params = Params::new();
/// params.set(":id", "42");
/// assert_eq!(params.param(":id"), "42");
/// assert_eq!(params.param(":missing"), "");
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: SmallVec<[(String, String); 8]>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a capture
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Latest value bound to `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value bound to `name`, or `""` when nothing was captured
    pub fn param(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// Number of captures written
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all captures before reusing the context for another request
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Current end of the log
    pub fn mark(&self) -> Mark {
        Mark(self.entries.len())
    }

    /// Drop every capture written after `mark`
    pub fn restore(&mut self, mark: Mark) {
        self.entries.truncate(mark.0);
    }

    /// Captures in write order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Captures as a map, later writes win
    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}
