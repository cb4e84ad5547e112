//! Upstream lineage over `Parent` edges.

use std::collections::BTreeSet;

use petgraph::graph::{EdgeReference, NodeIndex};
use petgraph::visit::{DfsPostOrder, EdgeFiltered};

use crate::graph::{EdgeKind, NodeGraph, NodeType};

/// `roots` and everything they read from, each node after all of its parents.
///
/// This is the order node queries have to be declared in as CTEs.
pub fn upstream_nodes(graph: &NodeGraph, roots: &[NodeIndex]) -> Vec<NodeIndex> {
    let parents_only = EdgeFiltered::from_fn(graph.inner(), |edge: EdgeReference<'_, EdgeKind>| {
        matches!(edge.weight(), EdgeKind::Parent)
    });

    let mut order = Vec::new();
    let mut dfs = DfsPostOrder::empty(&parents_only);
    for &root in roots {
        dfs.move_to(root);
        while let Some(idx) = dfs.next(&parents_only) {
            order.push(idx);
        }
    }
    order
}

/// Physical tables read by `roots`, sorted and deduplicated.
pub fn upstream_tables(graph: &NodeGraph, roots: &[NodeIndex]) -> Vec<String> {
    upstream_nodes(graph, roots)
        .into_iter()
        .map(|idx| &graph[idx])
        .filter(|node| node.node_type == NodeType::Source)
        .filter_map(|node| node.current().table.as_ref())
        .map(|table| table.qualified_name())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
