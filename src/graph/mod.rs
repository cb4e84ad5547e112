//! NodeGraph - the arena of nodes, revisions and dimension links.
//!
//! Every node lives in a `petgraph::DiGraph` and is addressed by its
//! `NodeIndex`. Columns refer to the dimension node they link to by index,
//! so cycles between dimensions are just edges and never ownership.
//!
//! Two kinds of edges are kept for the current revision of every node:
//! - `DimensionLink`: a column of the node links to a dimension node
//! - `Parent`: the node's query reads from another node


use std::collections::HashMap;
use std::ops::Index;

use petgraph::graph::DiGraph;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogError, NodeDefinition};
use crate::semantic::error::{SemanticError, SemanticResult};

pub use petgraph::graph::NodeIndex;

/// Revision label given to nodes that don't declare one.
pub const INITIAL_VERSION: &str = "v1.0";

/// Kind of node in the metrics DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Source,
    Transform,
    Dimension,
    Metric,
    Cube,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Source => "source",
            NodeType::Transform => "transform",
            NodeType::Dimension => "dimension",
            NodeType::Metric => "metric",
            NodeType::Cube => "cube",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tag attached to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnAttribute {
    /// The column is a dimension attribute in its own right.
    Dimension,
    /// The column identifies rows of its node; used as the default join column.
    PrimaryKey,
    Custom(String),
}

impl From<String> for ColumnAttribute {
    fn from(value: String) -> Self {
        match value.as_str() {
            "dimension" => ColumnAttribute::Dimension,
            "primary_key" => ColumnAttribute::PrimaryKey,
            _ => ColumnAttribute::Custom(value),
        }
    }
}

impl From<ColumnAttribute> for String {
    fn from(value: ColumnAttribute) -> Self {
        match value {
            ColumnAttribute::Dimension => "dimension".to_string(),
            ColumnAttribute::PrimaryKey => "primary_key".to_string(),
            ColumnAttribute::Custom(name) => name,
        }
    }
}

/// A physical warehouse table: `catalog.schema.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalTable {
    #[serde(default)]
    pub catalog: String,
    #[serde(default)]
    pub schema: String,
    pub table: String,
}

impl PhysicalTable {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Non-empty name parts, outermost first.
    pub fn parts(&self) -> Vec<&str> {
        [&self.catalog, &self.schema, &self.table]
            .into_iter()
            .map(String::as_str)
            .filter(|part| !part.is_empty())
            .collect()
    }

    pub fn qualified_name(&self) -> String {
        self.parts().join(".")
    }
}

impl std::fmt::Display for PhysicalTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// A column's link to a dimension node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionLink {
    pub node: NodeIndex,
    /// Explicit join column on the dimension node.
    pub column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: String,
    pub attributes: Vec<ColumnAttribute>,
    pub dimension: Option<DimensionLink>,
}

impl Column {
    pub fn has_attribute(&self, attribute: &ColumnAttribute) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn is_primary_key(&self) -> bool {
        self.has_attribute(&ColumnAttribute::PrimaryKey)
    }
}

/// An immutable version of a node's definition.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRevision {
    pub version: String,
    pub query: Option<String>,
    pub table: Option<PhysicalTable>,
    pub columns: Vec<Column>,
    /// Nodes the query reads from, in declaration order.
    pub parents: Vec<NodeIndex>,
}

impl NodeRevision {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column other nodes join against: the primary key, else the first column.
    pub fn join_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.is_primary_key())
            .or_else(|| self.columns.first())
    }
}

/// A node with its full revision history.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub node_type: NodeType,
    pub deactivated_at: Option<String>,
    revisions: Vec<NodeRevision>,
    current: usize,
}

impl Node {
    pub fn new(name: impl Into<String>, node_type: NodeType, revision: NodeRevision) -> Self {
        Self {
            name: name.into(),
            node_type,
            deactivated_at: None,
            revisions: vec![revision],
            current: 0,
        }
    }

    /// The current revision. A node always has one.
    pub fn current(&self) -> &NodeRevision {
        &self.revisions[self.current]
    }

    /// All revisions, oldest first.
    pub fn revisions(&self) -> &[NodeRevision] {
        &self.revisions
    }

    pub fn is_deactivated(&self) -> bool {
        self.deactivated_at.is_some()
    }

    /// Append a revision and make it current. Earlier revisions are kept as-is.
    pub fn publish(&mut self, revision: NodeRevision) -> &NodeRevision {
        self.revisions.push(revision);
        self.current = self.revisions.len() - 1;
        self.current()
    }

    /// Version label for the next revision: `v3.1` becomes `v4.0`.
    pub fn next_version(&self) -> String {
        let current = &self.current().version;
        current
            .strip_prefix('v')
            .and_then(|rest| rest.split('.').next())
            .and_then(|major| major.parse::<u64>().ok())
            .map(|major| format!("v{}.0", major + 1))
            .unwrap_or_else(|| format!("v{}.0", self.revisions.len() + 1))
    }
}

/// Edge data between nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// `column` of the source node links to the target dimension.
    DimensionLink { column: String },
    /// The source node's query reads from the target node.
    Parent,
}

/// Graph of all nodes in a catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    graph: DiGraph<Node, EdgeKind>,
    node_indices: HashMap<String, NodeIndex>,
}

impl NodeGraph {
    /// Build the graph from a catalog, resolving every name reference.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self, CatalogError> {
        let mut node_indices = HashMap::with_capacity(catalog.nodes.len());
        for (i, definition) in catalog.nodes.iter().enumerate() {
            if node_indices
                .insert(definition.name.clone(), NodeIndex::new(i))
                .is_some()
            {
                return Err(CatalogError::DuplicateNode(definition.name.clone()));
            }
        }

        let mut graph = NodeGraph {
            graph: DiGraph::with_capacity(catalog.nodes.len(), 0),
            node_indices,
        };

        // Indices were assigned up front, so links can be resolved before
        // their targets are added.
        for definition in &catalog.nodes {
            let revision =
                graph.resolve_revision(definition, INITIAL_VERSION.to_string())?;
            let mut node = Node::new(&definition.name, definition.node_type, revision);
            node.deactivated_at = definition.deactivated_at.clone();
            graph.graph.add_node(node);
        }

        for idx in graph.graph.node_indices() {
            let node = &graph.graph[idx];
            graph.check_links(&node.name, node.node_type, idx, node.current())?;
        }
        for idx in graph.graph.node_indices() {
            graph.refresh_edges(idx);
        }

        log::debug!(
            "built node graph: {} nodes, {} edges",
            graph.graph.node_count(),
            graph.graph.edge_count()
        );
        Ok(graph)
    }

    /// Publish a definition: add the node if it is new, otherwise append a
    /// revision to it and move its current pointer.
    pub fn publish(&mut self, definition: &NodeDefinition) -> Result<NodeIndex, CatalogError> {
        let Some(&idx) = self.node_indices.get(&definition.name) else {
            return self.add_node(definition);
        };

        let existing = &self.graph[idx];
        if existing.node_type != definition.node_type {
            return Err(CatalogError::InvalidDefinition {
                node: definition.name.clone(),
                reason: format!(
                    "cannot change node type from {} to {}",
                    existing.node_type, definition.node_type
                ),
            });
        }

        let revision = self.resolve_revision(definition, existing.next_version())?;
        self.check_links(&definition.name, definition.node_type, idx, &revision)?;

        let node = &mut self.graph[idx];
        node.deactivated_at = definition.deactivated_at.clone();
        let version = node.publish(revision).version.clone();
        self.refresh_edges(idx);

        log::debug!("published {} {}", definition.name, version);
        Ok(idx)
    }

    fn add_node(&mut self, definition: &NodeDefinition) -> Result<NodeIndex, CatalogError> {
        // Reserve the index first so the node may link to itself.
        let idx = NodeIndex::new(self.graph.node_count());
        self.node_indices.insert(definition.name.clone(), idx);

        let revision = self
            .resolve_revision(definition, INITIAL_VERSION.to_string())
            .and_then(|revision| {
                self.check_links(&definition.name, definition.node_type, idx, &revision)?;
                Ok(revision)
            });
        let revision = match revision {
            Ok(revision) => revision,
            Err(e) => {
                self.node_indices.remove(&definition.name);
                return Err(e);
            }
        };

        let mut node = Node::new(&definition.name, definition.node_type, revision);
        node.deactivated_at = definition.deactivated_at.clone();
        self.graph.add_node(node);
        self.refresh_edges(idx);

        log::debug!("added {} {}", definition.node_type, definition.name);
        Ok(idx)
    }

    /// Look up a node by name, optionally restricted to some node types.
    ///
    /// An empty `kinds` slice accepts any type.
    pub fn get_node_by_name(&self, name: &str, kinds: &[NodeType]) -> SemanticResult<NodeIndex> {
        self.node_indices
            .get(name)
            .copied()
            .filter(|&idx| kinds.is_empty() || kinds.contains(&self.graph[idx].node_type))
            .ok_or_else(|| SemanticError::UnknownNode {
                name: name.to_string(),
                allowed: kinds.to_vec(),
            })
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.node_indices.get(name).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    /// All nodes in catalog order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Nodes of one type, sorted by name.
    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<NodeIndex> {
        let mut found: Vec<NodeIndex> = self
            .nodes()
            .filter(|(_, node)| node.node_type == node_type)
            .map(|(idx, _)| idx)
            .collect();
        found.sort_by(|a, b| self.graph[*a].name.cmp(&self.graph[*b].name));
        found
    }

    /// Parents of a node's current revision, in declaration order.
    pub fn parents(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.graph[idx].current().parents
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of (column, dimension) links across all current revisions.
    pub fn link_count(&self) -> usize {
        self.graph
            .edge_weights()
            .filter(|edge| matches!(edge, EdgeKind::DimensionLink { .. }))
            .count()
    }

    /// The underlying petgraph, for traversal helpers.
    pub(crate) fn inner(&self) -> &DiGraph<Node, EdgeKind> {
        &self.graph
    }

    fn lookup(&self, node: &str, reference: &str) -> Result<NodeIndex, CatalogError> {
        self.node_indices
            .get(reference)
            .copied()
            .ok_or_else(|| CatalogError::UnknownReference {
                node: node.to_string(),
                reference: reference.to_string(),
            })
    }

    fn resolve_revision(
        &self,
        definition: &NodeDefinition,
        default_version: String,
    ) -> Result<NodeRevision, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidDefinition {
            node: definition.name.clone(),
            reason,
        };

        let has_query = definition
            .query
            .as_deref()
            .is_some_and(|q| !q.trim().is_empty());
        match definition.node_type {
            NodeType::Source if definition.table.is_none() => {
                return Err(invalid("source nodes need a physical table".into()));
            }
            NodeType::Source => {}
            NodeType::Transform | NodeType::Dimension | NodeType::Metric | NodeType::Cube
                if !has_query =>
            {
                return Err(invalid(format!(
                    "{} nodes need a query",
                    definition.node_type
                )));
            }
            NodeType::Transform | NodeType::Dimension | NodeType::Metric | NodeType::Cube => {}
        }

        let mut columns: Vec<Column> = Vec::with_capacity(definition.columns.len());
        for column in &definition.columns {
            if columns.iter().any(|c| c.name == column.name) {
                return Err(invalid(format!("duplicate column `{}`", column.name)));
            }
            let dimension = column
                .dimension
                .as_deref()
                .map(|target| -> Result<DimensionLink, CatalogError> {
                    Ok(DimensionLink {
                        node: self.lookup(&definition.name, target)?,
                        column: column.dimension_column.clone(),
                    })
                })
                .transpose()?;
            columns.push(Column {
                name: column.name.clone(),
                column_type: column.column_type.clone(),
                attributes: column.attributes.clone(),
                dimension,
            });
        }

        let parents = definition
            .parents
            .iter()
            .map(|parent| self.lookup(&definition.name, parent))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NodeRevision {
            version: definition.version.clone().unwrap_or(default_version),
            query: definition.query.clone(),
            table: definition.table.clone(),
            columns,
            parents,
        })
    }

    /// Dimension links must point at dimension nodes, and an explicit join
    /// column must exist on the target.
    fn check_links(
        &self,
        name: &str,
        node_type: NodeType,
        idx: NodeIndex,
        revision: &NodeRevision,
    ) -> Result<(), CatalogError> {
        for column in &revision.columns {
            let Some(link) = &column.dimension else {
                continue;
            };
            // A self-link is checked against the revision being added.
            let (target_name, target_type, target_revision) = if link.node == idx {
                (name, node_type, revision)
            } else {
                let target = &self.graph[link.node];
                (target.name.as_str(), target.node_type, target.current())
            };

            if target_type != NodeType::Dimension {
                return Err(CatalogError::InvalidDefinition {
                    node: name.to_string(),
                    reason: format!(
                        "column `{}` links to `{}`, which is a {} node, not a dimension",
                        column.name, target_name, target_type
                    ),
                });
            }
            if let Some(join_column) = &link.column {
                if target_revision.column(join_column).is_none() {
                    return Err(CatalogError::InvalidDefinition {
                        node: name.to_string(),
                        reason: format!(
                            "column `{}` joins on `{}.{}`, which does not exist",
                            column.name, target_name, join_column
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Replace a node's outgoing edges with those of its current revision.
    fn refresh_edges(&mut self, idx: NodeIndex) {
        while let Some(edge) = self.graph.first_edge(idx, Direction::Outgoing) {
            self.graph.remove_edge(edge);
        }

        let revision = self.graph[idx].current().clone();
        for column in &revision.columns {
            if let Some(link) = &column.dimension {
                self.graph.add_edge(
                    idx,
                    link.node,
                    EdgeKind::DimensionLink {
                        column: column.name.clone(),
                    },
                );
            }
        }
        for &parent in &revision.parents {
            self.graph.add_edge(idx, parent, EdgeKind::Parent);
        }
    }
}

impl Index<NodeIndex> for NodeGraph {
    type Output = Node;

    fn index(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }
}
