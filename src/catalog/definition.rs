//! Serializable node definitions.
//!
//! These are the shapes a catalog snapshot is written in. They reference
//! other nodes by name; [`NodeGraph`](crate::graph::NodeGraph) resolves the
//! names into arena indices.

use serde::{Deserialize, Serialize};

use crate::graph::{ColumnAttribute, NodeType, PhysicalTable};

/// A node as written in a catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Revision label. Defaults to `v1.0` for new nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Node query in the canonical dialect. Absent for source nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Physical table backing a source node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<PhysicalTable>,

    /// Names of the nodes this node's query reads from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated_at: Option<String>,
}

impl NodeDefinition {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            version: None,
            query: None,
            table: None,
            parents: vec![],
            columns: vec![],
            deactivated_at: None,
        }
    }

    /// A source node backed by a physical table.
    pub fn source(name: impl Into<String>, table: PhysicalTable) -> Self {
        Self {
            table: Some(table),
            ..Self::new(name, NodeType::Source)
        }
    }

    pub fn transform(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, NodeType::Transform).with_query(query)
    }

    pub fn dimension(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, NodeType::Dimension).with_query(query)
    }

    pub fn metric(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, NodeType::Metric).with_query(query)
    }

    pub fn cube(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, NodeType::Cube).with_query(query)
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn deactivated(mut self, at: impl Into<String>) -> Self {
        self.deactivated_at = Some(at.into());
        self
    }
}

/// A column as written in a catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<ColumnAttribute>,

    /// Name of the dimension node this column links to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,

    /// Column on the dimension node to join against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_column: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            attributes: vec![],
            dimension: None,
            dimension_column: None,
        }
    }

    pub fn with_attribute(mut self, attribute: ColumnAttribute) -> Self {
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute);
        }
        self
    }

    /// Tag the column as a dimension attribute.
    pub fn dimension_attribute(self) -> Self {
        self.with_attribute(ColumnAttribute::Dimension)
    }

    pub fn primary_key(self) -> Self {
        self.with_attribute(ColumnAttribute::PrimaryKey)
    }

    /// Link this column to a dimension node.
    pub fn linked_to(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    /// Link this column to a specific column of a dimension node.
    pub fn linked_to_column(
        mut self,
        dimension: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.dimension = Some(dimension.into());
        self.dimension_column = Some(column.into());
        self
    }
}
