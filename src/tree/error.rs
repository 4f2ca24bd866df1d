//! Error types for tree construction
//!
//! Only malformed input is an error. Missing active-path matches, zero-size
//! viewports and vanished focus nodes are handled in place.

use thiserror::Error;

/// Contract violations by the data source
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    #[error("Tree snapshot contains no nodes")]
    Empty,

    #[error("No root node: every node names a parent")]
    NoRoot,

    #[error("Multiple root nodes: '{first}' and '{second}' both have no parent")]
    MultipleRoots { first: String, second: String },

    #[error("Duplicate node id '{0}'")]
    DuplicateId(String),

    #[error("Node '{id}' names parent '{parent}' which does not exist")]
    DanglingParent { id: String, parent: String },

    #[error("Node '{id}' names parent '{declared}' but is nested under '{actual}'")]
    ParentMismatch {
        id: String,
        declared: String,
        actual: String,
    },

    #[error("Cycle detected: node '{0}' is not reachable from the root")]
    Cycle(String),

    #[error("Invalid snapshot JSON: {0}")]
    InvalidJson(String),
}

/// Result type for tree construction
pub type TreeResult<T> = Result<T, TreeError>;
