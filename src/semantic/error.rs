//! Error types for dimension resolution and SQL composition.
//!
//! Every variant is terminal for the request that raised it. Callers format
//! the message; the variants carry enough context to do so.

use std::fmt;

use crate::graph::NodeType;

/// Result type for semantic operations.
pub type SemanticResult<T> = Result<T, SemanticError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SemanticError {
    /// No node with this name, or the node is not of an allowed type.
    UnknownNode {
        name: String,
        /// Empty when any node type was acceptable.
        allowed: Vec<NodeType>,
    },

    /// A requested or filtered dimension is not reachable from the node.
    DimensionNotFound { node: String, dimension: String },

    /// The transpilation plugin rejected the canonical SQL.
    Transpilation { plugin: String, message: String },

    /// Resolution dequeued more nodes than the configured budget.
    CycleBudgetExceeded { node: String, budget: usize },

    /// No transpilation plugin registered under this name.
    UnknownPlugin { name: String },

    /// The node cannot be composed into SQL.
    InvalidNode { name: String, reason: String },

    /// A filter expression could not be parsed.
    InvalidFilter { filter: String, reason: String },
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticError::UnknownNode { name, allowed } => {
                if allowed.is_empty() {
                    write!(f, "No node `{}` exists.", name)
                } else {
                    let kinds: Vec<&str> = allowed.iter().map(NodeType::as_str).collect();
                    write!(f, "No node `{}` exists of kind {}.", name, kinds.join(" or "))
                }
            }
            SemanticError::DimensionNotFound { node, dimension } => {
                write!(
                    f,
                    "Dimension '{}' is not available on node '{}'",
                    dimension, node
                )
            }
            SemanticError::Transpilation { plugin, message } => {
                write!(f, "Transpilation plugin '{}' failed: {}", plugin, message)
            }
            SemanticError::CycleBudgetExceeded { node, budget } => {
                write!(
                    f,
                    "Resolving dimensions for '{}' visited more than {} nodes",
                    node, budget
                )
            }
            SemanticError::UnknownPlugin { name } => {
                write!(f, "Unknown transpilation plugin: '{}'", name)
            }
            SemanticError::InvalidNode { name, reason } => {
                write!(f, "Invalid node '{}': {}", name, reason)
            }
            SemanticError::InvalidFilter { filter, reason } => {
                write!(f, "Invalid filter '{}': {}", filter, reason)
            }
        }
    }
}

impl std::error::Error for SemanticError {}
