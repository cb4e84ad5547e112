//! Catalog snapshots: the node definitions the graph is built from.
//!
//! A catalog is a flat list of node definitions, loaded from TOML or JSON:
//!
//! ```toml
//! [[nodes]]
//! name = "orders"
//! type = "source"
//! table = { catalog = "warehouse", schema = "sales", table = "orders" }
//! columns = [
//!     { name = "id", type = "bigint", attributes = ["primary_key"] },
//!     { name = "customer_id", type = "bigint", dimension = "customers" },
//! ]
//! ```

mod definition;

pub use definition::{ColumnDefinition, NodeDefinition};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors raised while loading a catalog or building a graph from it.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported catalog format: {0} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Node `{0}` is defined more than once")]
    DuplicateNode(String),

    #[error("Node `{node}` references unknown node `{reference}`")]
    UnknownReference { node: String, reference: String },

    #[error("Invalid definition for node `{node}`: {reason}")]
    InvalidDefinition { node: String, reason: String },
}

/// A snapshot of node definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: NodeDefinition) -> Self {
        self.nodes.push(node);
        self
    }

    /// Load a catalog, picking the format from the file extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn get(&self, name: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|node| node.name == name)
    }
}
