// tests/semantic/shared_test.rs
mod common;

use common::{names, sales_graph};
use junction::graph::{NodeGraph, NodeIndex, NodeType};
use junction::semantic::{
    get_dimensions, get_shared_dimensions, DimensionResolver, SharedDimensions,
};

fn metric(g: &NodeGraph, name: &str) -> NodeIndex {
    g.get_node_by_name(name, &[NodeType::Metric]).unwrap()
}

#[test]
fn test_singleton_equals_dimensions() {
    let g = sales_graph();
    for name in ["revenue", "completed_revenue", "transfer_volume"] {
        let m = metric(&g, name);
        assert_eq!(
            get_shared_dimensions(&g, &[m]).unwrap(),
            get_dimensions(&g, m).unwrap(),
            "{}",
            name
        );
    }
}

#[test]
fn test_metrics_on_same_parent_share_everything() {
    let g = sales_graph();
    let revenue = metric(&g, "revenue");
    let completed = metric(&g, "completed_revenue");

    assert_eq!(
        get_shared_dimensions(&g, &[revenue, completed]).unwrap(),
        get_dimensions(&g, revenue).unwrap()
    );
}

#[test]
fn test_intersection_by_name() {
    let g = sales_graph();
    let revenue = metric(&g, "revenue");
    let volume = metric(&g, "transfer_volume");

    // customers.* is prefixed for transfers, so only countries is shared
    let shared = get_shared_dimensions(&g, &[revenue, volume]).unwrap();
    assert_eq!(names(&shared), vec!["countries.code", "countries.name"]);
}

#[test]
fn test_commutative_and_idempotent_under_duplicates() {
    let g = sales_graph();
    let revenue = metric(&g, "revenue");
    let completed = metric(&g, "completed_revenue");
    let volume = metric(&g, "transfer_volume");

    let ab = get_shared_dimensions(&g, &[revenue, volume]).unwrap();
    assert_eq!(ab, get_shared_dimensions(&g, &[volume, revenue]).unwrap());
    assert_eq!(ab, get_shared_dimensions(&g, &[revenue, volume, volume]).unwrap());
    assert_eq!(
        ab,
        get_shared_dimensions(&g, &[volume, completed, revenue, completed]).unwrap()
    );
}

#[test]
fn test_empty_input() {
    let g = sales_graph();
    assert!(get_shared_dimensions(&g, &[]).unwrap().is_empty());
}

#[test]
fn test_configured_resolver_budget_applies() {
    let g = sales_graph();
    let revenue = metric(&g, "revenue");
    let volume = metric(&g, "transfer_volume");

    let shared = SharedDimensions::new(DimensionResolver::new(&g).with_max_visited_nodes(3));
    assert!(shared.resolve(&[revenue]).is_ok());
    assert!(shared.resolve(&[revenue, volume]).is_err());
}
