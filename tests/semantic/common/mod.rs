// tests/semantic/common/mod.rs
#![allow(dead_code)]

use junction::catalog::{Catalog, ColumnDefinition, NodeDefinition};
use junction::graph::{NodeGraph, PhysicalTable};
use junction::semantic::DimensionAttributeOutput;

/// A small sales catalog:
///
/// - `orders` (source) links to `customers` through `customer_id`
/// - `customers` (dimension) reads `raw_customers` and links to `countries`
/// - `transfers` links to `customers` twice (`buyer_id`, `seller_id`)
/// - `revenue`, `completed_revenue` and `transfer_volume` are metrics
pub fn sales_catalog() -> Catalog {
    Catalog::new()
        .with_node(
            NodeDefinition::source(
                "raw_customers",
                PhysicalTable::new("warehouse", "crm", "customers"),
            )
            .with_column(ColumnDefinition::new("id", "bigint").primary_key())
            .with_column(ColumnDefinition::new("region", "string"))
            .with_column(ColumnDefinition::new("country_code", "string")),
        )
        .with_node(
            NodeDefinition::dimension(
                "customers",
                "SELECT id, region, country_code FROM raw_customers",
            )
            .with_parent("raw_customers")
            .with_column(ColumnDefinition::new("id", "bigint").primary_key())
            .with_column(ColumnDefinition::new("region", "string"))
            .with_column(ColumnDefinition::new("country_code", "string").linked_to("countries")),
        )
        .with_node(
            NodeDefinition::dimension("countries", "SELECT code, name FROM ref.countries")
                .with_column(ColumnDefinition::new("code", "string").primary_key())
                .with_column(ColumnDefinition::new("name", "string")),
        )
        .with_node(
            NodeDefinition::source("orders", PhysicalTable::new("warehouse", "sales", "orders"))
                .with_column(ColumnDefinition::new("id", "bigint").primary_key())
                .with_column(ColumnDefinition::new("customer_id", "bigint").linked_to("customers"))
                .with_column(ColumnDefinition::new("amount", "double"))
                .with_column(ColumnDefinition::new("status", "string")),
        )
        .with_node(
            NodeDefinition::transform(
                "transfers",
                "SELECT id, buyer_id, seller_id, amount FROM raw_transfers",
            )
            .with_column(ColumnDefinition::new("id", "bigint").primary_key())
            .with_column(ColumnDefinition::new("buyer_id", "bigint").linked_to("customers"))
            .with_column(ColumnDefinition::new("seller_id", "bigint").linked_to("customers"))
            .with_column(ColumnDefinition::new("amount", "double")),
        )
        .with_node(
            NodeDefinition::metric("revenue", "SELECT SUM(amount) FROM orders")
                .with_parent("orders")
                .with_column(ColumnDefinition::new("revenue", "double")),
        )
        .with_node(
            NodeDefinition::metric(
                "completed_revenue",
                "SELECT SUM(o.amount) AS total FROM orders o WHERE o.status = 'complete'",
            )
            .with_parent("orders")
            .with_column(ColumnDefinition::new("total", "double")),
        )
        .with_node(
            NodeDefinition::metric("transfer_volume", "SELECT SUM(amount) FROM transfers")
                .with_parent("transfers")
                .with_column(ColumnDefinition::new("transfer_volume", "double")),
        )
}

pub fn sales_graph() -> NodeGraph {
    NodeGraph::from_catalog(&sales_catalog()).expect("sales catalog is valid")
}

pub fn names(dims: &[DimensionAttributeOutput]) -> Vec<&str> {
    dims.iter().map(|d| d.name.as_str()).collect()
}

pub fn dim(name: &str, attribute_type: &str, link: &str) -> DimensionAttributeOutput {
    DimensionAttributeOutput {
        name: name.into(),
        attribute_type: attribute_type.into(),
        link: link.into(),
    }
}
