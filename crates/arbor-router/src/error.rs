//! Error types for arbor-router

use thiserror::Error;

/// Result type alias for tree construction
pub type Result<T> = std::result::Result<T, Error>;

/// Route construction errors
///
/// Every variant is raised while a route or mount is being registered.
/// Matching never fails with an error: a path that does not route is `None`.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed pattern syntax, or a pattern with more than eight optional
    /// segments
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Regex in a segment failed to compile
    #[error("Invalid regex in segment {segment:?}: {source}")]
    InvalidRegex {
        segment: String,
        #[source]
        source: regex::Error,
    },

    /// The same parameter name bound twice in one pattern
    #[error("Duplicate parameter {name} in pattern {pattern:?}")]
    DuplicateParam { pattern: String, name: String },

    /// Mount prefix with no segments
    #[error("Mount prefix must contain at least one segment")]
    EmptyPrefix,

    /// Mounting would make a tree reachable from itself
    #[error("Mounting at {prefix:?} would create a cycle")]
    MountCycle { prefix: String },
}

impl Error {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
