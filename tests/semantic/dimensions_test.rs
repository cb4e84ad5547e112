// tests/semantic/dimensions_test.rs
mod common;

use common::{dim, names, sales_graph};
use junction::catalog::{Catalog, ColumnDefinition, NodeDefinition};
use junction::graph::{NodeGraph, NodeType};
use junction::semantic::{get_dimensions, DimensionResolver, SemanticError};

fn graph(catalog: Catalog) -> NodeGraph {
    NodeGraph::from_catalog(&catalog).unwrap()
}

#[test]
fn test_orders_reach_customer_region() {
    let g = graph(
        Catalog::new()
            .with_node(
                NodeDefinition::transform("orders", "SELECT id, customer_id FROM raw_orders")
                    .with_column(ColumnDefinition::new("id", "bigint"))
                    .with_column(
                        ColumnDefinition::new("customer_id", "bigint").linked_to("customers"),
                    ),
            )
            .with_node(
                NodeDefinition::dimension("customers", "SELECT region FROM raw_customers")
                    .with_column(ColumnDefinition::new("region", "string").dimension_attribute()),
            ),
    );
    let orders = g.get_node_by_name("orders", &[]).unwrap();

    let dims = get_dimensions(&g, orders).unwrap();

    // The linked column is itself a dimension attribute of orders
    assert_eq!(
        dims,
        vec![
            dim("customers.region", "string", ""),
            dim("orders.customer_id", "bigint", ""),
        ]
    );
}

#[test]
fn test_multi_link_dimensions_are_prefixed() {
    let g = sales_graph();
    let transfers = g.get_node_by_name("transfers", &[]).unwrap();

    let dims = get_dimensions(&g, transfers).unwrap();

    assert_eq!(
        names(&dims),
        vec![
            "buyer_id.customers.country_code",
            "buyer_id.customers.id",
            "buyer_id.customers.region",
            "countries.code",
            "countries.name",
            "seller_id.customers.country_code",
            "seller_id.customers.id",
            "seller_id.customers.region",
            "transfers.buyer_id",
            "transfers.seller_id",
        ]
    );
    assert!(dims.contains(&dim("buyer_id.customers.region", "string", "buyer_id")));
    assert!(dims.contains(&dim("seller_id.customers.region", "string", "seller_id")));
    // countries is reached through a single column of customers
    assert!(dims.contains(&dim("countries.name", "string", "")));
}

#[test]
fn test_single_link_is_unprefixed() {
    let g = sales_graph();
    let revenue = g.get_node_by_name("revenue", &[NodeType::Metric]).unwrap();

    let dims = get_dimensions(&g, revenue).unwrap();

    assert_eq!(
        names(&dims),
        vec![
            "countries.code",
            "countries.name",
            "customers.country_code",
            "customers.id",
            "customers.region",
            "orders.customer_id",
        ]
    );
    assert!(dims.iter().all(|d| d.link.is_empty()));
}

#[test]
fn test_metric_resolves_from_parents() {
    let g = sales_graph();
    let revenue = g.get_node_by_name("revenue", &[]).unwrap();
    let orders = g.get_node_by_name("orders", &[]).unwrap();

    assert_eq!(
        get_dimensions(&g, revenue).unwrap(),
        get_dimensions(&g, orders).unwrap()
    );
}

#[test]
fn test_no_dimensions_is_empty() {
    let g = graph(
        Catalog::new()
            .with_node(
                NodeDefinition::transform("events", "SELECT id, ts FROM raw_events")
                    .with_column(ColumnDefinition::new("id", "bigint"))
                    .with_column(ColumnDefinition::new("ts", "timestamp")),
            )
            .with_node(
                NodeDefinition::metric("event_count", "SELECT COUNT(*) FROM events")
                    .with_parent("events"),
            )
            .with_node(NodeDefinition::metric("orphan", "SELECT COUNT(*) FROM nowhere")),
    );

    for name in ["events", "event_count", "orphan"] {
        let idx = g.get_node_by_name(name, &[]).unwrap();
        assert!(get_dimensions(&g, idx).unwrap().is_empty(), "{}", name);
    }
}

#[test]
fn test_deactivated_dimension_contributes_nothing() {
    let g = graph(
        Catalog::new()
            .with_node(
                NodeDefinition::transform("shipments", "SELECT origin, destination FROM raw")
                    .with_column(ColumnDefinition::new("origin", "string").linked_to("warehouses"))
                    .with_column(
                        ColumnDefinition::new("destination", "string").linked_to("warehouses"),
                    ),
            )
            .with_node(
                NodeDefinition::dimension("warehouses", "SELECT code, city FROM raw_warehouses")
                    .deactivated("2024-01-01T00:00:00Z")
                    .with_column(ColumnDefinition::new("code", "string").primary_key())
                    .with_column(ColumnDefinition::new("city", "string")),
            ),
    );
    let shipments = g.get_node_by_name("shipments", &[]).unwrap();
    let warehouses = g.get_node_by_name("warehouses", &[]).unwrap();

    let dims = get_dimensions(&g, shipments).unwrap();
    assert_eq!(
        names(&dims),
        vec!["shipments.destination", "shipments.origin"]
    );

    // Even resolving from the deactivated node itself yields nothing
    assert!(get_dimensions(&g, warehouses).unwrap().is_empty());
}

#[test]
fn test_dimension_cycle_terminates() {
    let g = graph(
        Catalog::new()
            .with_node(
                NodeDefinition::dimension("accounts", "SELECT id, owner_id FROM raw_accounts")
                    .with_column(ColumnDefinition::new("id", "bigint").primary_key())
                    .with_column(ColumnDefinition::new("owner_id", "bigint").linked_to("users")),
            )
            .with_node(
                NodeDefinition::dimension("users", "SELECT id, account_id FROM raw_users")
                    .with_column(ColumnDefinition::new("id", "bigint").primary_key())
                    .with_column(
                        ColumnDefinition::new("account_id", "bigint").linked_to("accounts"),
                    ),
            ),
    );
    let accounts = g.get_node_by_name("accounts", &[]).unwrap();

    let dims = get_dimensions(&g, accounts).unwrap();
    assert_eq!(
        names(&dims),
        vec!["accounts.id", "accounts.owner_id", "users.account_id", "users.id"]
    );
}

#[test]
fn test_output_sorted_unique_and_idempotent() {
    let g = sales_graph();

    for (idx, node) in g.nodes() {
        let first = get_dimensions(&g, idx).unwrap();
        let second = get_dimensions(&g, idx).unwrap();
        assert_eq!(first, second, "{}", node.name);

        let mut sorted = names(&first);
        sorted.sort();
        sorted.dedup();
        assert_eq!(names(&first), sorted, "{}", node.name);
    }
}

#[test]
fn test_budget_guard() {
    let g = sales_graph();
    let transfers = g.get_node_by_name("transfers", &[]).unwrap();

    let err = DimensionResolver::new(&g)
        .with_max_visited_nodes(2)
        .resolve(transfers)
        .unwrap_err();
    assert_eq!(
        err,
        SemanticError::CycleBudgetExceeded {
            node: "transfers".into(),
            budget: 2
        }
    );

    // transfers, customers (twice) and countries
    assert!(DimensionResolver::new(&g)
        .with_max_visited_nodes(4)
        .resolve(transfers)
        .is_ok());
}

#[test]
fn test_shared_downstream_dimension_follows_first_link() {
    let g = sales_graph();
    let transfers = g.get_node_by_name("transfers", &[]).unwrap();

    let resolved = DimensionResolver::new(&g).resolve_paths(transfers).unwrap();
    let countries = resolved
        .iter()
        .find(|d| d.output.name == "countries.name")
        .unwrap();

    // countries is reached through both customers paths; buyer_id is queued first
    let hops: Vec<(&str, &str)> = countries
        .path
        .iter()
        .map(|hop| (hop.column.as_str(), hop.link.as_str()))
        .collect();
    assert_eq!(hops, vec![("buyer_id", "buyer_id"), ("country_code", "")]);
    assert_eq!(countries.output.link, "");
}
