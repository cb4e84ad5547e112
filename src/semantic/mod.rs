//! Semantic layer - dimension resolution and SQL composition over a node graph.
//!
//! Requests go through four steps:
//!
//! 1. **Resolve** - walk dimension links from a node ([`dimensions`])
//! 2. **Intersect** - keep the dimensions several metrics share ([`shared`])
//! 3. **Build** - join the dimensions a request needs and emit SQL ([`builder`])
//! 4. **Transpile** - hand canonical SQL to a plugin ([`crate::transpile`])
//!
//! [`lineage`] orders the CTEs a statement declares, [`filter`] and
//! [`metric`] read the predicates and metric queries the builder embeds.

pub mod builder;
pub mod dimensions;
pub mod error;
pub mod filter;
pub mod lineage;
pub mod metric;
pub mod shared;

pub use builder::{
    amenable_name, build_query, ColumnMetadata, GeneratedSql, NodeNameVersion, QueryBuilder,
    QueryRequest,
};
pub use dimensions::{
    get_dimensions, DimensionAttributeOutput, DimensionResolver, JoinHop, ResolvedDimension,
    DEFAULT_MAX_VISITED_NODES,
};
pub use error::{SemanticError, SemanticResult};
pub use filter::{Filter, FilterOp, FilterValue};
pub use lineage::{upstream_nodes, upstream_tables};
pub use metric::{list_metrics, list_metrics_with, MetricProjection, MetricQuery, MetricSummary};
pub use shared::{get_shared_dimensions, SharedDimensions};
