// tests/semantic/build_query_test.rs
mod common;

use std::sync::Arc;

use common::sales_graph;
use insta::assert_snapshot;
use junction::config::Settings;
use junction::graph::{NodeGraph, NodeIndex};
use junction::semantic::{
    build_query, ColumnMetadata, Filter, FilterOp, FilterValue, GeneratedSql, QueryBuilder,
    QueryRequest, SemanticError,
};
use junction::sql::Dialect;
use junction::transpile::{
    NoopTranspiler, TranspilationPlugin, TranspileError, TranspilerRegistry,
};

fn node(g: &NodeGraph, name: &str) -> NodeIndex {
    g.get_node_by_name(name, &[]).unwrap()
}

fn column(name: &str, column_type: &str, entity: &str) -> ColumnMetadata {
    ColumnMetadata {
        name: name.into(),
        column_type: column_type.into(),
        semantic_entity: Some(entity.into()),
    }
}

struct FailingTranspiler;

impl TranspilationPlugin for FailingTranspiler {
    fn name(&self) -> &str {
        "failing"
    }

    fn transpile(&self, _sql: &str, from: Dialect, to: Dialect) -> Result<String, TranspileError> {
        Err(TranspileError::Unsupported {
            from,
            to,
            message: "no".into(),
        })
    }
}

#[test]
fn test_metric_sliced_and_filtered() {
    let g = sales_graph();
    let revenue = node(&g, "revenue");

    let generated = build_query(
        &g,
        revenue,
        &["customers.region"],
        &[Filter::eq("customers.region", "west")],
        None,
    )
    .unwrap();

    assert_snapshot!(generated.sql, @r"
    WITH
    `orders` AS (
    SELECT
      `id`,
      `customer_id`,
      `amount`,
      `status`
    FROM `warehouse`.`sales`.`orders`
    ),
    `raw_customers` AS (
    SELECT
      `id`,
      `region`,
      `country_code`
    FROM `warehouse`.`crm`.`customers`
    ),
    `customers` AS (
    SELECT id, region, country_code FROM `raw_customers`
    ),
    `revenue_input` AS (
    SELECT
      `orders`.`id`,
      `orders`.`customer_id`,
      `orders`.`amount`,
      `orders`.`status`,
      `customers`.`region` AS `customers_DOT_region`
    FROM `orders`
    LEFT JOIN `customers` ON `orders`.`customer_id` = `customers`.`id`
    WHERE `customers`.`region` = 'west'
    )
    SELECT
      `orders`.`customers_DOT_region`,
      SUM(amount) AS `revenue`
    FROM `revenue_input` AS `orders`
    GROUP BY `orders`.`customers_DOT_region`
    ");

    assert_eq!(generated.node.name, "revenue");
    assert_eq!(generated.node.version, "v1.0");
    assert_eq!(generated.dialect, Dialect::Spark);
    assert_eq!(
        generated.columns,
        vec![
            column("customers_DOT_region", "string", "customers.region"),
            column("revenue", "double", "revenue"),
        ]
    );
    assert_eq!(
        generated.upstream_tables,
        vec!["warehouse.crm.customers", "warehouse.sales.orders"]
    );
}

#[test]
fn test_metric_keeps_alias_and_where() {
    let g = sales_graph();
    let completed = node(&g, "completed_revenue");

    let generated = build_query(&g, completed, &[], &[], None).unwrap();

    assert_snapshot!(generated.sql, @r"
    WITH
    `orders` AS (
    SELECT
      `id`,
      `customer_id`,
      `amount`,
      `status`
    FROM `warehouse`.`sales`.`orders`
    ),
    `completed_revenue_input` AS (
    SELECT
      `orders`.`id`,
      `orders`.`customer_id`,
      `orders`.`amount`,
      `orders`.`status`
    FROM `orders`
    )
    SELECT
      SUM(o.amount) AS `total`
    FROM `completed_revenue_input` AS `o`
    WHERE o.status = 'complete'
    ");
    assert_eq!(
        generated.columns,
        vec![column("total", "double", "completed_revenue")]
    );
    assert_eq!(generated.upstream_tables, vec!["warehouse.sales.orders"]);
}

#[test]
fn test_multi_link_joins_get_distinct_aliases() {
    let g = sales_graph();
    let transfers = node(&g, "transfers");

    let generated = build_query(
        &g,
        transfers,
        &["buyer_id.customers.region", "seller_id.customers.region"],
        &[],
        None,
    )
    .unwrap();

    assert_snapshot!(generated.sql, @r"
    WITH
    `transfers` AS (
    SELECT id, buyer_id, seller_id, amount FROM raw_transfers
    ),
    `raw_customers` AS (
    SELECT
      `id`,
      `region`,
      `country_code`
    FROM `warehouse`.`crm`.`customers`
    ),
    `customers` AS (
    SELECT id, region, country_code FROM `raw_customers`
    )
    SELECT
      `transfers`.`id`,
      `transfers`.`buyer_id`,
      `transfers`.`seller_id`,
      `transfers`.`amount`,
      `buyer_id_DOT_customers`.`region` AS `buyer_id_DOT_customers_DOT_region`,
      `seller_id_DOT_customers`.`region` AS `seller_id_DOT_customers_DOT_region`
    FROM `transfers`
    LEFT JOIN `customers` AS `buyer_id_DOT_customers` ON `transfers`.`buyer_id` = `buyer_id_DOT_customers`.`id`
    LEFT JOIN `customers` AS `seller_id_DOT_customers` ON `transfers`.`seller_id` = `seller_id_DOT_customers`.`id`
    ");
    assert_eq!(generated.upstream_tables, vec!["warehouse.crm.customers"]);
}

#[test]
fn test_two_hop_join_reuses_first_hop() {
    let g = sales_graph();
    let orders = node(&g, "orders");

    let generated = build_query(
        &g,
        orders,
        &["customers.region", "countries.name", "customers.region"],
        &[],
        None,
    )
    .unwrap();

    assert_eq!(generated.sql.matches("LEFT JOIN").count(), 2);
    assert!(generated
        .sql
        .contains("LEFT JOIN `countries` ON `customers`.`country_code` = `countries`.`code`"));
    // Requested twice, selected once
    assert_eq!(generated.sql.matches("AS `customers_DOT_region`").count(), 1);
    assert_eq!(
        generated.columns.last(),
        Some(&column("countries_DOT_name", "string", "countries.name"))
    );
    assert_eq!(generated.columns.len(), 6);
}

#[test]
fn test_filter_dimension_is_joined_without_selecting_it() {
    let g = sales_graph();
    let orders = node(&g, "orders");

    let filter: Filter = "countries.code IN ('NZ', 'AU')".parse().unwrap();
    let generated = build_query(&g, orders, &[], &[filter], None).unwrap();

    assert!(generated.sql.contains("LEFT JOIN `customers`"));
    assert!(generated.sql.contains("LEFT JOIN `countries`"));
    assert!(generated
        .sql
        .contains("WHERE `countries`.`code` IN ('NZ', 'AU')"));
    assert!(!generated.sql.contains("countries_DOT_code"));
    assert_eq!(generated.columns.len(), 4);
}

#[test]
fn test_unknown_dimension() {
    let g = sales_graph();
    let revenue = node(&g, "revenue");

    let err = build_query(&g, revenue, &["customers.age"], &[], None).unwrap_err();
    assert_eq!(
        err,
        SemanticError::DimensionNotFound {
            node: "revenue".into(),
            dimension: "customers.age".into(),
        }
    );

    // Multi-link dimensions are only available under their prefix
    let transfers = node(&g, "transfers");
    let err = build_query(&g, transfers, &["customers.region"], &[], None).unwrap_err();
    assert!(matches!(err, SemanticError::DimensionNotFound { .. }));

    let err = build_query(
        &g,
        revenue,
        &[],
        &[Filter::eq("customers.age", 40i64)],
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SemanticError::DimensionNotFound { dimension, .. } if dimension == "customers.age"
    ));
}

#[test]
fn test_metric_needs_exactly_one_parent() {
    use junction::catalog::{ColumnDefinition, NodeDefinition};

    let catalog = common::sales_catalog().with_node(
        NodeDefinition::metric("blended", "SELECT SUM(amount) FROM orders")
            .with_parent("orders")
            .with_parent("transfers")
            .with_column(ColumnDefinition::new("blended", "double")),
    );
    let g = NodeGraph::from_catalog(&catalog).unwrap();
    let blended = node(&g, "blended");

    let err = build_query(&g, blended, &[], &[], None).unwrap_err();
    assert!(matches!(err, SemanticError::InvalidNode { name, .. } if name == "blended"));
}

#[test]
fn test_canonical_dialect_without_plugin() {
    let g = sales_graph();
    let revenue = node(&g, "revenue");

    let canonical = build_query(&g, revenue, &[], &[], None).unwrap();
    let requested = build_query(&g, revenue, &[], &[], Some(Dialect::Trino)).unwrap();

    // No plugin configured: canonical SQL is returned and reported as such
    assert_eq!(requested.sql, canonical.sql);
    assert_eq!(requested.dialect, Dialect::Spark);
}

#[test]
fn test_noop_plugin_round_trip() {
    let g = sales_graph();
    let revenue = node(&g, "revenue");
    let builder = QueryBuilder::new(&g).with_transpiler(Arc::new(NoopTranspiler));

    let canonical = builder.build(revenue, &QueryRequest::new()).unwrap();
    let same = builder
        .build(revenue, &QueryRequest::new().with_dialect(Dialect::Spark))
        .unwrap();
    assert_eq!(same, canonical);

    let other = builder
        .build(revenue, &QueryRequest::new().with_dialect(Dialect::Postgres))
        .unwrap();
    assert_eq!(other.sql, canonical.sql);
    assert_eq!(other.dialect, Dialect::Postgres);
}

#[test]
fn test_sqlparser_plugin_from_settings() {
    let g = sales_graph();
    let transfers = node(&g, "transfers");
    let settings = Settings::default().with_transpilation_plugin("sqlparser");
    let registry = TranspilerRegistry::with_builtin();

    let builder = QueryBuilder::from_settings(&g, &settings, &registry).unwrap();
    let generated = builder
        .build(
            transfers,
            &QueryRequest::new()
                .with_dimension("buyer_id.customers.region")
                .with_filter(Filter::eq("buyer_id.customers.region", "west"))
                .with_dialect(Dialect::Trino),
        )
        .unwrap();

    assert_eq!(generated.dialect, Dialect::Trino);
    assert!(!generated.sql.contains('`'));
    assert!(generated.sql.contains(
        r#"LEFT JOIN "customers" AS "buyer_id_DOT_customers" ON "transfers"."buyer_id" = "buyer_id_DOT_customers"."id""#
    ));
    assert!(generated
        .sql
        .contains(r#"WHERE "buyer_id_DOT_customers"."region" = 'west'"#));
}

#[test]
fn test_unknown_plugin_in_settings() {
    let g = sales_graph();
    let settings = Settings::default().with_transpilation_plugin("sqlglot");

    let err = QueryBuilder::from_settings(&g, &settings, &TranspilerRegistry::with_builtin())
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown transpilation plugin: 'sqlglot'");
}

#[test]
fn test_plugin_failure_propagates() {
    let g = sales_graph();
    let revenue = node(&g, "revenue");
    let builder = QueryBuilder::new(&g).with_transpiler(Arc::new(FailingTranspiler));

    let err = builder
        .build(revenue, &QueryRequest::new().with_dialect(Dialect::DuckDb))
        .unwrap_err();
    assert_eq!(
        err,
        SemanticError::Transpilation {
            plugin: "failing".into(),
            message: "cannot transpile from spark to duckdb: no".into(),
        }
    );

    // Not invoked when the canonical dialect is requested
    assert!(builder
        .build(revenue, &QueryRequest::new().with_dialect(Dialect::Spark))
        .is_ok());
}

#[test]
fn test_generated_sql_serializes() {
    let g = sales_graph();
    let revenue = node(&g, "revenue");
    let generated = build_query(&g, revenue, &["customers.region"], &[], None).unwrap();

    let json = serde_json::to_value(&generated).unwrap();
    assert_eq!(json["node"]["name"], "revenue");
    assert_eq!(json["dialect"], "spark");
    assert_eq!(json["columns"][0]["type"], "string");
    assert_eq!(json["upstream_tables"][1], "warehouse.sales.orders");

    let back: GeneratedSql = serde_json::from_value(json).unwrap();
    assert_eq!(back, generated);
}

fn namespaced_graph(customers_query: &str) -> NodeGraph {
    use junction::catalog::{Catalog, ColumnDefinition, NodeDefinition};
    use junction::graph::PhysicalTable;

    let catalog = Catalog::new()
        .with_node(
            NodeDefinition::source("default.raw_orders", PhysicalTable::new("wh", "sales", "orders"))
                .with_column(ColumnDefinition::new("id", "bigint").primary_key())
                .with_column(ColumnDefinition::new("customer_id", "bigint")),
        )
        .with_node(
            NodeDefinition::source(
                "default.raw_customers",
                PhysicalTable::new("wh", "crm", "customers"),
            )
            .with_column(ColumnDefinition::new("id", "bigint").primary_key())
            .with_column(ColumnDefinition::new("region", "string")),
        )
        .with_node(
            NodeDefinition::transform(
                "default.orders",
                "SELECT id, customer_id FROM default.raw_orders",
            )
            .with_parent("default.raw_orders")
            .with_column(ColumnDefinition::new("id", "bigint").primary_key())
            .with_column(
                ColumnDefinition::new("customer_id", "bigint").linked_to("default.customers"),
            ),
        )
        .with_node(
            NodeDefinition::dimension("default.customers", customers_query)
                .with_parent("default.raw_customers")
                .with_column(ColumnDefinition::new("id", "bigint").primary_key())
                .with_column(ColumnDefinition::new("region", "string")),
        );
    NodeGraph::from_catalog(&catalog).unwrap()
}

#[test]
fn test_namespaced_parents_are_read_from_their_ctes() {
    let g = namespaced_graph(
        "SELECT id, region FROM `default`.`raw_customers` WHERE region IS NOT NULL",
    );
    let orders = node(&g, "default.orders");

    let generated =
        build_query(&g, orders, &["default.customers.region"], &[], None).unwrap();

    assert!(generated.sql.contains(
        "`default_DOT_orders` AS (\nSELECT id, customer_id FROM `default_DOT_raw_orders`\n)"
    ));
    assert!(generated.sql.contains(
        "SELECT id, region FROM `default_DOT_raw_customers` WHERE region IS NOT NULL"
    ));
    assert!(generated.sql.contains("`default_DOT_raw_orders` AS ("));
    assert!(generated.sql.contains("`default_DOT_raw_customers` AS ("));
    assert!(!generated.sql.contains("default.raw_"));
    assert!(generated.sql.contains(
        "LEFT JOIN `default_DOT_customers` ON `default_DOT_orders`.`customer_id` = `default_DOT_customers`.`id`"
    ));
    assert_eq!(
        generated.upstream_tables,
        vec!["wh.crm.customers", "wh.sales.orders"]
    );

    let sqlparser = TranspilerRegistry::with_builtin()
        .get_transpilation_plugin("sqlparser")
        .unwrap();
    let trino = QueryBuilder::new(&g)
        .with_transpiler(sqlparser)
        .build(
            orders,
            &QueryRequest::new()
                .with_dimension("default.customers.region")
                .with_dialect(Dialect::Trino),
        )
        .unwrap();
    assert!(trino
        .sql
        .contains(r#"SELECT id, customer_id FROM "default_DOT_raw_orders""#));
}

#[test]
fn test_unparseable_node_query() {
    let g = namespaced_graph("SELEC id FROM default.raw_customers");
    let orders = node(&g, "default.orders");

    let err = build_query(&g, orders, &["default.customers.region"], &[], None).unwrap_err();
    assert!(matches!(
        err,
        SemanticError::InvalidNode { name, .. } if name == "default.customers"
    ));
}

#[test]
fn test_non_finite_filter_is_an_error() {
    let g = sales_graph();
    let orders = node(&g, "orders");

    let filter = Filter::new("orders.customer_id", FilterOp::Eq, FilterValue::Float(f64::NAN));
    let err = build_query(&g, orders, &[], &[filter], None).unwrap_err();
    assert!(matches!(err, SemanticError::InvalidFilter { .. }));
}

#[test]
fn test_shared_downstream_dimension_joins_through_first_link() {
    let g = sales_graph();
    let transfers = node(&g, "transfers");

    let generated = build_query(&g, transfers, &["countries.name"], &[], None).unwrap();

    assert_eq!(generated.sql.matches("LEFT JOIN").count(), 2);
    assert!(generated.sql.contains(
        "LEFT JOIN `customers` AS `buyer_id_DOT_customers` ON `transfers`.`buyer_id` = `buyer_id_DOT_customers`.`id`"
    ));
    assert!(generated.sql.contains(
        "LEFT JOIN `countries` ON `buyer_id_DOT_customers`.`country_code` = `countries`.`code`"
    ));
    assert!(!generated.sql.contains("seller_id_DOT_customers"));
}
