//! Query builder - SQL for a node sliced by dimensions and filtered.
//!
//! The generated statement declares every node it reads as a CTE (upstream
//! nodes first), selects from the node and LEFT JOINs each distinct join path
//! the requested dimensions and filters need:
//!
//! ```sql
//! WITH
//! `orders` AS (...),
//! `customers` AS (...)
//! SELECT
//!   `orders`.`id`,
//!   `orders`.`customer_id`,
//!   `customers`.`region` AS `customers_DOT_region`
//! FROM `orders`
//! LEFT JOIN `customers` ON `orders`.`customer_id` = `customers`.`id`
//! ```
//!
//! A metric is evaluated over that joined statement (declared as an input CTE)
//! and grouped by the requested dimensions.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{visit_relations_mut, Ident, Statement};
use sqlparser::parser::Parser;

use crate::config::Settings;
use crate::error::JunctionError;
use crate::graph::{NodeGraph, NodeType};
use crate::sql::expr::{col, raw, table_col, Expr, ExprExt};
use crate::sql::query::{Cte, Query, SelectExpr, TableRef};
use crate::sql::{Dialect, SqlDialect};
use crate::transpile::{TranspilationPlugin, TranspilerRegistry};

use super::dimensions::{DimensionResolver, JoinHop, ResolvedDimension};
use super::error::{SemanticError, SemanticResult};
use super::filter::Filter;
use super::lineage::{upstream_nodes, upstream_tables};
use super::metric::MetricQuery;

/// Replace the dots of a dimension name so it can be used as a SQL alias.
///
/// `buyer_id.customers.region` becomes `buyer_id_DOT_customers_DOT_region`.
pub fn amenable_name(name: &str) -> String {
    name.replace('.', "_DOT_")
}

/// Name and revision of the node SQL was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeNameVersion {
    pub name: String,
    pub version: String,
}

/// An output column of generated SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    /// `node.column` or dimension attribute the column carries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_entity: Option<String>,
}

/// SQL generated for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSql {
    pub node: NodeNameVersion,
    pub sql: String,
    pub columns: Vec<ColumnMetadata>,
    pub dialect: Dialect,
    pub upstream_tables: Vec<String>,
}

/// What to slice and filter a node by.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "requests have no effect until passed to QueryBuilder::build"]
pub struct QueryRequest {
    pub dimensions: Vec<String>,
    pub filters: Vec<Filter>,
    /// Output dialect. `None` means the canonical dialect.
    pub dialect: Option<Dialect>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimensions.push(dimension.into());
        self
    }

    pub fn with_dimensions<I, S>(mut self, dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions.extend(dimensions.into_iter().map(Into::into));
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }
}

/// Composes SQL for nodes of one graph.
#[derive(Clone)]
pub struct QueryBuilder<'g> {
    graph: &'g NodeGraph,
    resolver: DimensionResolver<'g>,
    canonical: Dialect,
    transpiler: Option<Arc<dyn TranspilationPlugin>>,
}

impl std::fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("canonical", &self.canonical)
            .field("transpiler", &self.transpiler.as_ref().map(|p| p.name()))
            .finish_non_exhaustive()
    }
}

impl<'g> QueryBuilder<'g> {
    /// A builder with the default canonical dialect and no transpiler.
    pub fn new(graph: &'g NodeGraph) -> Self {
        Self {
            graph,
            resolver: DimensionResolver::new(graph),
            canonical: Dialect::default(),
            transpiler: None,
        }
    }

    /// A builder configured from settings, with the transpiler looked up in
    /// `registry`.
    pub fn from_settings(
        graph: &'g NodeGraph,
        settings: &Settings,
        registry: &TranspilerRegistry,
    ) -> Result<Self, JunctionError> {
        let mut builder = Self::new(graph)
            .with_canonical_dialect(settings.sql.canonical_dialect)
            .with_max_visited_nodes(settings.resolver.max_visited_nodes);
        if let Some(name) = settings.resolved_transpilation_plugin()? {
            builder = builder.with_transpiler(registry.get_transpilation_plugin(&name)?);
        }
        Ok(builder)
    }

    pub fn with_canonical_dialect(mut self, dialect: Dialect) -> Self {
        self.canonical = dialect;
        self
    }

    pub fn with_transpiler(mut self, plugin: Arc<dyn TranspilationPlugin>) -> Self {
        self.transpiler = Some(plugin);
        self
    }

    pub fn with_max_visited_nodes(mut self, max_visited_nodes: usize) -> Self {
        self.resolver = self.resolver.with_max_visited_nodes(max_visited_nodes);
        self
    }

    pub fn canonical_dialect(&self) -> Dialect {
        self.canonical
    }

    pub fn resolver(&self) -> DimensionResolver<'g> {
        self.resolver
    }

    /// Generate SQL for `idx`.
    pub fn build(&self, idx: NodeIndex, request: &QueryRequest) -> SemanticResult<GeneratedSql> {
        let graph = self.graph;
        let node = &graph[idx];

        let (base, metric) = match node.node_type {
            NodeType::Metric => {
                let [parent] = graph.parents(idx) else {
                    return Err(SemanticError::InvalidNode {
                        name: node.name.clone(),
                        reason: format!(
                            "a metric must have exactly one parent, found {}",
                            graph.parents(idx).len()
                        ),
                    });
                };
                let query = node.current().query.as_deref().unwrap_or_default();
                (*parent, Some(MetricQuery::parse(&node.name, query, self.canonical)?))
            }
            NodeType::Source | NodeType::Transform | NodeType::Dimension | NodeType::Cube => {
                (idx, None)
            }
        };

        let resolved = self.resolver.resolve_paths(idx)?;
        let lookup = |dimension: &str| {
            resolved
                .iter()
                .find(|d| d.output.name == dimension)
                .ok_or_else(|| SemanticError::DimensionNotFound {
                    node: node.name.clone(),
                    dimension: dimension.to_string(),
                })
        };

        let mut seen = HashSet::new();
        let dimensions = request
            .dimensions
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .map(|name| lookup(name.as_str()))
            .collect::<SemanticResult<Vec<&ResolvedDimension>>>()?;
        let filters = request
            .filters
            .iter()
            .map(|filter| Ok((filter, lookup(filter.dimension.as_str())?)))
            .collect::<SemanticResult<Vec<_>>>()?;

        let base_alias = amenable_name(&graph[base].name);
        let mut joins = JoinPlan::new(graph, &base_alias);

        // SELECT: the base node's own columns, then the dimensions
        let base_revision = graph[base].current();
        let mut select: Vec<SelectExpr> = Vec::new();
        let mut columns: Vec<ColumnMetadata> = Vec::new();
        for column in &base_revision.columns {
            select.push(table_col(&base_alias, &column.name).into());
            columns.push(ColumnMetadata {
                name: column.name.clone(),
                column_type: column.column_type.clone(),
                semantic_entity: Some(format!("{}.{}", graph[base].name, column.name)),
            });
        }
        let mut dimension_columns: Vec<ColumnMetadata> = Vec::new();
        for dimension in &dimensions {
            let alias = joins.alias_for(&dimension.path);
            let output_name = amenable_name(&dimension.output.name);
            select.push(table_col(&alias, &dimension.column).alias(&output_name));
            dimension_columns.push(ColumnMetadata {
                name: output_name,
                column_type: dimension.output.attribute_type.clone(),
                semantic_entity: Some(dimension.output.name.clone()),
            });
        }

        let mut joined = Query::new()
            .select(select)
            .from(TableRef::new(&base_alias));
        for (filter, dimension) in &filters {
            let alias = joins.alias_for(&dimension.path);
            joined = joined.filter(filter.to_expr(table_col(&alias, &dimension.column))?);
        }
        for join in joins.joins() {
            joined = joined.left_join(join.table.clone(), join.on.clone());
        }

        let mut roots = vec![base];
        roots.extend(joins.joins().iter().map(|join| join.node));
        let ctes = upstream_nodes(graph, &roots)
            .into_iter()
            .map(|upstream| node_cte(graph, upstream, self.canonical))
            .collect::<SemanticResult<Vec<_>>>()?;

        let (query, output_columns) = match metric {
            None => {
                let mut query = joined;
                query.with = ctes;
                columns.extend(dimension_columns);
                (query, columns)
            }
            Some(metric) => self.metric_query(idx, &metric, joined, ctes, dimension_columns),
        };

        let canonical_sql = query.to_sql(self.canonical);
        let (sql, dialect) = self.transpile(canonical_sql, request.dialect)?;

        roots.push(idx);
        log::debug!(
            "built {} sql for {} with {} dimension(s), {} filter(s), {} join(s)",
            dialect,
            node.name,
            dimensions.len(),
            filters.len(),
            joins.joins().len()
        );

        Ok(GeneratedSql {
            node: NodeNameVersion {
                name: node.name.clone(),
                version: node.current().version.clone(),
            },
            sql,
            columns: output_columns,
            dialect,
            upstream_tables: upstream_tables(graph, &roots),
        })
    }

    /// Wrap the joined input in the metric's aggregation.
    fn metric_query(
        &self,
        idx: NodeIndex,
        metric: &MetricQuery,
        joined: Query,
        ctes: Vec<Cte>,
        dimension_columns: Vec<ColumnMetadata>,
    ) -> (Query, Vec<ColumnMetadata>) {
        let node = &self.graph[idx];
        let input = format!("{}_input", amenable_name(&node.name));
        let reference = &metric.from_reference;

        let group_by: Vec<Expr> = dimension_columns
            .iter()
            .map(|column| table_col(reference, &column.name))
            .collect();
        let mut select: Vec<SelectExpr> = group_by.iter().cloned().map(SelectExpr::from).collect();
        let mut columns = dimension_columns;

        let single = metric.projection.len() == 1;
        for projection in &metric.projection {
            let alias = projection
                .alias
                .clone()
                .or_else(|| single.then(|| amenable_name(&node.name)));
            let output_name = alias.clone().unwrap_or_else(|| projection.expr.clone());
            let column_type = node
                .current()
                .column(&output_name)
                .or_else(|| single.then(|| node.current().columns.first()).flatten())
                .map(|c| c.column_type.clone())
                .unwrap_or_else(|| "unknown".to_string());

            let expr = raw(&projection.expr);
            select.push(match &alias {
                Some(alias) => expr.alias(alias),
                None => expr.into(),
            });
            columns.push(ColumnMetadata {
                name: output_name,
                column_type,
                semantic_entity: Some(node.name.clone()),
            });
        }

        let mut query = Query::new()
            .select(select)
            .from(TableRef::new(&input).with_alias(reference))
            .group_by(group_by);
        if let Some(selection) = &metric.selection {
            query = query.filter(raw(selection));
        }
        query.with = ctes;
        query.with.push(Cte::new(&input, joined));

        (query, columns)
    }

    /// Hand canonical SQL to the transpiler when another dialect is requested.
    fn transpile(
        &self,
        canonical_sql: String,
        requested: Option<Dialect>,
    ) -> SemanticResult<(String, Dialect)> {
        match (requested, &self.transpiler) {
            (Some(target), Some(plugin)) if target != self.canonical => {
                let sql = plugin
                    .transpile(&canonical_sql, self.canonical, target)
                    .map_err(|e| SemanticError::Transpilation {
                        plugin: plugin.name().to_string(),
                        message: e.to_string(),
                    })?;
                Ok((sql, target))
            }
            (Some(target), None) if target != self.canonical => {
                log::debug!(
                    "no transpilation plugin configured, returning {} sql instead of {}",
                    self.canonical,
                    target
                );
                Ok((canonical_sql, self.canonical))
            }
            _ => Ok((canonical_sql, self.canonical)),
        }
    }
}

/// Generate SQL for a node with the default builder.
pub fn build_query(
    graph: &NodeGraph,
    node: NodeIndex,
    dimensions: &[&str],
    filters: &[Filter],
    dialect: Option<Dialect>,
) -> SemanticResult<GeneratedSql> {
    let mut request = QueryRequest::new()
        .with_dimensions(dimensions.iter().copied())
        .with_filters(filters.iter().cloned());
    request.dialect = dialect;
    QueryBuilder::new(graph).build(node, &request)
}

/// CTE declaring a node's query. Source nodes select from their table.
fn node_cte(graph: &NodeGraph, idx: NodeIndex, dialect: Dialect) -> SemanticResult<Cte> {
    let node = &graph[idx];
    let name = amenable_name(&node.name);
    let revision = node.current();

    match &revision.table {
        Some(table) if node.node_type == NodeType::Source => {
            let select: Vec<Expr> = if revision.columns.is_empty() {
                vec![raw("*")]
            } else {
                revision.columns.iter().map(|c| col(&c.name)).collect()
            };
            Ok(Cte::new(
                &name,
                Query::new()
                    .select(select)
                    .from(TableRef::qualified(table.parts())),
            ))
        }
        _ => Ok(Cte::raw(&name, &node_query(graph, idx, dialect)?)),
    }
}

/// A node's query with its parents referred to by their CTE names.
///
/// Queries that read no parent are returned as written.
fn node_query(graph: &NodeGraph, idx: NodeIndex, dialect: Dialect) -> SemanticResult<String> {
    let node = &graph[idx];
    let sql = node.current().query.as_deref().unwrap_or_default();

    let parents: HashMap<&str, String> = graph
        .parents(idx)
        .iter()
        .map(|&parent| (graph[parent].name.as_str(), amenable_name(&graph[parent].name)))
        .collect();
    if parents.is_empty() {
        return Ok(sql.to_string());
    }

    let invalid = |reason: String| SemanticError::InvalidNode {
        name: node.name.clone(),
        reason,
    };
    let parser_dialect = dialect.parser_dialect();
    let mut statements = Parser::parse_sql(&*parser_dialect, sql)
        .map_err(|e| invalid(format!("query does not parse: {}", e)))?;
    let [Statement::Query(_)] = statements.as_slice() else {
        return Err(invalid("query must be a single SELECT".into()));
    };

    let quote = dialect.identifier_quote();
    let mut renamed = 0;
    let _ = visit_relations_mut(&mut statements, |table| {
        let reference = table
            .0
            .iter()
            .map(|ident| ident.value.as_str())
            .collect::<Vec<_>>()
            .join(".");
        if let Some(cte) = parents.get(reference.as_str()) {
            table.0 = vec![Ident::with_quote(quote, cte.as_str())];
            renamed += 1;
        }
        ControlFlow::<()>::Continue(())
    });

    if renamed == 0 {
        return Ok(sql.to_string());
    }
    log::debug!("renamed {} parent reference(s) in {}", renamed, node.name);
    Ok(statements.iter().map(ToString::to_string).collect())
}

// =============================================================================
// Join planning
// =============================================================================

/// A LEFT JOIN for one join path prefix.
#[derive(Debug, Clone)]
struct PlannedJoin {
    node: NodeIndex,
    table: TableRef,
    on: Expr,
}

/// Assigns one aliased LEFT JOIN per distinct join path.
#[derive(Debug)]
struct JoinPlan<'g> {
    graph: &'g NodeGraph,
    base_alias: String,
    joins: Vec<PlannedJoin>,
    aliases: HashMap<Vec<JoinHop>, String>,
    used: HashSet<String>,
}

impl<'g> JoinPlan<'g> {
    fn new(graph: &'g NodeGraph, base_alias: &str) -> Self {
        Self {
            graph,
            base_alias: base_alias.to_string(),
            joins: vec![],
            aliases: HashMap::new(),
            used: HashSet::from([base_alias.to_string()]),
        }
    }

    fn joins(&self) -> &[PlannedJoin] {
        &self.joins
    }

    /// Alias of the table at the end of `path`, joining any hop not yet joined.
    fn alias_for(&mut self, path: &[JoinHop]) -> String {
        let mut current = self.base_alias.clone();
        for depth in 0..path.len() {
            let key = &path[..=depth];
            if let Some(alias) = self.aliases.get(key) {
                current = alias.clone();
                continue;
            }

            let hop = &path[depth];
            let target = &self.graph[hop.to].name;
            let label = if hop.link.is_empty() {
                target.clone()
            } else {
                format!("{}.{}", hop.link, target)
            };
            let alias = self.unique_alias(amenable_name(&label));

            let cte = amenable_name(target);
            let table = if alias == cte {
                TableRef::new(&cte)
            } else {
                TableRef::new(&cte).with_alias(&alias)
            };
            self.joins.push(PlannedJoin {
                node: hop.to,
                table,
                on: table_col(&current, &hop.column).eq(table_col(&alias, &hop.to_column)),
            });
            self.aliases.insert(key.to_vec(), alias.clone());
            current = alias;
        }
        current
    }

    fn unique_alias(&mut self, candidate: String) -> String {
        let mut alias = candidate.clone();
        let mut n = 2;
        while !self.used.insert(alias.clone()) {
            alias = format!("{}_{}", candidate, n);
            n += 1;
        }
        alias
    }
}
