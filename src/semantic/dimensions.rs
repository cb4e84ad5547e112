//! Dimension resolution - which dimension attributes a node can be sliced by.
//!
//! The resolver walks dimension links breadth-first from a node. A metric
//! starts from its parents instead of itself. Every node is processed from a
//! FIFO queue, so the output (and the join path recorded for each attribute)
//! is deterministic for a given graph.
//!
//! When a node reaches the same dimension through more than one column
//! (`buyer_id` and `seller_id` both linking to `customers`), each path is
//! kept apart by prefixing attribute names with the link column:
//! `buyer_id.customers.region` and `seller_id.customers.region`.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::visit::{VisitMap, Visitable};
use serde::{Deserialize, Serialize};

use crate::graph::{Column, ColumnAttribute, NodeGraph, NodeRevision, NodeType};

use super::error::{SemanticError, SemanticResult};

/// Default bound on nodes a single resolution may dequeue.
pub const DEFAULT_MAX_VISITED_NODES: usize = 100_000;

/// A dimension attribute reachable from a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionAttributeOutput {
    /// `[link.]node.column`
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    /// Link column that disambiguates the path; empty when unambiguous.
    pub link: String,
}

/// One join step: `from.column = to.to_column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinHop {
    pub from: NodeIndex,
    pub column: String,
    pub to: NodeIndex,
    pub to_column: String,
    /// Link label the target was reached with; empty when unambiguous.
    pub link: String,
}

/// A resolved attribute with the node, column and join path it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDimension {
    pub output: DimensionAttributeOutput,
    pub node: NodeIndex,
    pub column: String,
    /// Hops from the traversal seed to `node`. Empty for the seed's own columns.
    pub path: Vec<JoinHop>,
}

#[derive(Debug)]
struct QueueItem {
    node: NodeIndex,
    link: String,
    path: Vec<JoinHop>,
}

impl QueueItem {
    fn seed(node: NodeIndex) -> Self {
        Self {
            node,
            link: String::new(),
            path: vec![],
        }
    }
}

/// Breadth-first dimension resolver over a [`NodeGraph`].
#[derive(Debug, Clone, Copy)]
pub struct DimensionResolver<'g> {
    graph: &'g NodeGraph,
    max_visited_nodes: usize,
}

impl<'g> DimensionResolver<'g> {
    pub fn new(graph: &'g NodeGraph) -> Self {
        Self {
            graph,
            max_visited_nodes: DEFAULT_MAX_VISITED_NODES,
        }
    }

    pub fn with_max_visited_nodes(mut self, max_visited_nodes: usize) -> Self {
        self.max_visited_nodes = max_visited_nodes;
        self
    }

    /// Dimension attributes reachable from `node`, sorted by name.
    pub fn resolve(&self, node: NodeIndex) -> SemanticResult<Vec<DimensionAttributeOutput>> {
        Ok(self
            .resolve_paths(node)?
            .into_iter()
            .map(|dimension| dimension.output)
            .collect())
    }

    /// Like [`resolve`](Self::resolve), keeping the join path of each attribute.
    pub fn resolve_paths(&self, start: NodeIndex) -> SemanticResult<Vec<ResolvedDimension>> {
        let graph = self.graph;
        let start_node = &graph[start];

        let mut queue: VecDeque<QueueItem> = match start_node.node_type {
            NodeType::Metric => graph
                .parents(start)
                .iter()
                .map(|&parent| QueueItem::seed(parent))
                .collect(),
            NodeType::Source | NodeType::Transform | NodeType::Dimension | NodeType::Cube => {
                VecDeque::from([QueueItem::seed(start)])
            }
        };

        let mut visited = graph.inner().visit_map();
        // (target, owning node, link column) triples already queued
        let mut enqueued: HashSet<(NodeIndex, NodeIndex, &'g str)> = HashSet::new();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut found: Vec<ResolvedDimension> = Vec::new();
        let mut dequeued = 0usize;

        while let Some(item) = queue.pop_front() {
            dequeued += 1;
            if dequeued > self.max_visited_nodes {
                return Err(SemanticError::CycleBudgetExceeded {
                    node: start_node.name.clone(),
                    budget: self.max_visited_nodes,
                });
            }

            visited.visit(item.node);
            let node = &graph[item.node];
            if node.is_deactivated() {
                log::warn!(
                    "skipping deactivated node {} while resolving {}",
                    node.name,
                    start_node.name
                );
                continue;
            }

            let revision = node.current();
            let multi_link = multi_link_targets(revision);
            let prefix = if item.link.is_empty() {
                String::new()
            } else {
                format!("{}.", item.link)
            };

            for column in &revision.columns {
                if is_dimensional(node.node_type, column) {
                    let name = format!("{}{}.{}", prefix, node.name, column.name);
                    if emitted.insert(name.clone()) {
                        found.push(ResolvedDimension {
                            output: DimensionAttributeOutput {
                                name,
                                attribute_type: column.column_type.clone(),
                                link: item.link.clone(),
                            },
                            node: item.node,
                            column: column.name.clone(),
                            path: item.path.clone(),
                        });
                    }
                }

                let Some(link) = &column.dimension else {
                    continue;
                };
                if visited.is_visited(&link.node)
                    || !enqueued.insert((link.node, item.node, column.name.as_str()))
                {
                    continue;
                }

                let target = graph[link.node].current();
                let to_column = link
                    .column
                    .clone()
                    .or_else(|| target.join_column().map(|c| c.name.clone()))
                    .unwrap_or_else(|| column.name.clone());
                let label = if multi_link.contains(&link.node) {
                    column.name.clone()
                } else {
                    String::new()
                };

                let mut path = item.path.clone();
                path.push(JoinHop {
                    from: item.node,
                    column: column.name.clone(),
                    to: link.node,
                    to_column,
                    link: label.clone(),
                });
                queue.push_back(QueueItem {
                    node: link.node,
                    link: label,
                    path,
                });
            }
        }

        found.sort_by(|a, b| a.output.name.cmp(&b.output.name));
        log::debug!(
            "resolved {} dimensions for {} ({} nodes dequeued)",
            found.len(),
            start_node.name,
            dequeued
        );
        Ok(found)
    }
}

/// Dimension nodes this revision links to through more than one column.
fn multi_link_targets(revision: &NodeRevision) -> HashSet<NodeIndex> {
    let mut counts: HashMap<NodeIndex, usize> = HashMap::new();
    for link in revision.columns.iter().filter_map(|c| c.dimension.as_ref()) {
        *counts.entry(link.node).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(node, _)| node)
        .collect()
}

fn is_dimensional(node_type: NodeType, column: &Column) -> bool {
    node_type == NodeType::Dimension
        || column.has_attribute(&ColumnAttribute::Dimension)
        || column.dimension.is_some()
}

/// Dimension attributes available on a node, sorted by name.
pub fn get_dimensions(
    graph: &NodeGraph,
    node: NodeIndex,
) -> SemanticResult<Vec<DimensionAttributeOutput>> {
    DimensionResolver::new(graph).resolve(node)
}
