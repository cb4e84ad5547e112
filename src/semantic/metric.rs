//! Metric queries and the metric listing.
//!
//! A metric query is a single aggregate SELECT over one parent node:
//!
//! ```sql
//! SELECT SUM(o.amount) AS revenue FROM orders o WHERE o.status = 'complete'
//! ```
//!
//! The query builder re-targets it at a joined input, so only its pieces are
//! kept: the projection, how the FROM table is referred to, and the WHERE.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{GroupByExpr, SelectItem, SetExpr, Statement, TableFactor};
use sqlparser::parser::Parser;

use crate::graph::{NodeGraph, NodeType};
use crate::sql::Dialect;

use super::dimensions::DimensionResolver;
use super::error::{SemanticError, SemanticResult};

/// One item of a metric's SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricProjection {
    /// Expression text in the canonical dialect.
    pub expr: String,
    pub alias: Option<String>,
}

/// The parts of a metric query the builder reuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub projection: Vec<MetricProjection>,
    /// Name the projection uses for the FROM table: its alias, else the
    /// last part of the table name.
    pub from_reference: String,
    /// WHERE predicate text, if any.
    pub selection: Option<String>,
}

impl MetricQuery {
    /// Parse a metric query written in `dialect`.
    ///
    /// `name` is only used for error messages.
    pub fn parse(name: &str, sql: &str, dialect: Dialect) -> SemanticResult<Self> {
        let invalid = |reason: String| SemanticError::InvalidNode {
            name: name.to_string(),
            reason,
        };

        let parser_dialect = dialect.parser_dialect();
        let statements = Parser::parse_sql(&*parser_dialect, sql)
            .map_err(|e| invalid(format!("metric query does not parse: {}", e)))?;

        let [Statement::Query(query)] = statements.as_slice() else {
            return Err(invalid("metric query must be a single SELECT".into()));
        };
        if query.with.is_some() {
            return Err(invalid("metric queries cannot use WITH".into()));
        }
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(invalid("metric query must be a plain SELECT".into()));
        };

        let grouped = match &select.group_by {
            GroupByExpr::All(_) => true,
            GroupByExpr::Expressions(exprs, _) => !exprs.is_empty(),
        };
        if grouped {
            return Err(invalid("metric queries cannot have GROUP BY".into()));
        }

        let [from] = select.from.as_slice() else {
            return Err(invalid("metric query must read from exactly one node".into()));
        };
        if !from.joins.is_empty() {
            return Err(invalid("metric queries cannot join".into()));
        }
        let TableFactor::Table {
            name: table, alias, ..
        } = &from.relation
        else {
            return Err(invalid("metric query must read from a node by name".into()));
        };
        let from_reference = match alias {
            Some(alias) => alias.name.value.clone(),
            None => table
                .0
                .last()
                .map(|ident| ident.value.clone())
                .unwrap_or_default(),
        };

        let projection = select
            .projection
            .iter()
            .map(|item| match item {
                SelectItem::UnnamedExpr(expr) => Ok(MetricProjection {
                    expr: expr.to_string(),
                    alias: None,
                }),
                SelectItem::ExprWithAlias { expr, alias } => Ok(MetricProjection {
                    expr: expr.to_string(),
                    alias: Some(alias.value.clone()),
                }),
                SelectItem::QualifiedWildcard(..) | SelectItem::Wildcard(..) => {
                    Err(invalid("metric queries cannot select *".into()))
                }
            })
            .collect::<SemanticResult<Vec<_>>>()?;

        Ok(MetricQuery {
            projection,
            from_reference,
            selection: select.selection.as_ref().map(ToString::to_string),
        })
    }
}

/// A metric with the dimensions it can be sliced by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    pub version: String,
    pub query: String,
    pub dimensions: Vec<String>,
}

/// Every active metric, sorted by name, with its resolved dimension names.
pub fn list_metrics(graph: &NodeGraph) -> SemanticResult<Vec<MetricSummary>> {
    list_metrics_with(DimensionResolver::new(graph), graph)
}

/// [`list_metrics`] with a configured resolver.
pub fn list_metrics_with(
    resolver: DimensionResolver<'_>,
    graph: &NodeGraph,
) -> SemanticResult<Vec<MetricSummary>> {
    graph
        .nodes_of_type(NodeType::Metric)
        .into_iter()
        .filter(|&idx| !graph[idx].is_deactivated())
        .map(|idx: NodeIndex| {
            let node = &graph[idx];
            Ok(MetricSummary {
                name: node.name.clone(),
                version: node.current().version.clone(),
                query: node.current().query.clone().unwrap_or_default(),
                dimensions: resolver
                    .resolve(idx)?
                    .into_iter()
                    .map(|dim| dim.name)
                    .collect(),
            })
        })
        .collect()
}
