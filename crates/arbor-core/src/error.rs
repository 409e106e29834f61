//! Error types for arbor-core

use thiserror::Error;

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a [`Router`](crate::Router)
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Malformed method-to-handler mapping
    #[error("Invalid mapping {mapping:?}: {reason}")]
    InvalidMapping { mapping: String, reason: String },

    /// Pattern, regex or mount rejected by the tree
    #[error(transparent)]
    Tree(#[from] arbor_router::Error),
}
