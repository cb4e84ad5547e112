//! # Junction
//!
//! Dimension resolution and multi-dialect SQL composition for a semantic
//! metrics layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Catalog (TOML / JSON snapshot)              │
//! │     (sources, transforms, dimensions, metrics, cubes)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [graph]
//! ┌─────────────────────────────────────────────────────────┐
//! │       NodeGraph (revisions, dimension links, parents)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [semantic]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Dimension resolver / shared dimensions / query builder │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [transpile]
//! ┌─────────────────────────────────────────────────────────┐
//! │                SQL in the requested dialect              │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod semantic;
pub mod sql;
pub mod transpile;

// Re-export SQL submodules at crate level
pub use sql::dialect;
pub use sql::expr;
pub use sql::query;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogError, ColumnDefinition, NodeDefinition};
    pub use crate::config::Settings;
    pub use crate::error::{JunctionError, JunctionResult};
    pub use crate::graph::{ColumnAttribute, NodeGraph, NodeType, PhysicalTable};
    pub use crate::semantic::{
        build_query, get_dimensions, get_shared_dimensions, list_metrics,
        DimensionAttributeOutput, DimensionResolver, Filter, FilterOp, FilterValue, GeneratedSql,
        QueryBuilder, QueryRequest, SemanticError, SemanticResult,
    };
    pub use crate::sql::{Dialect, SqlDialect};
    pub use crate::transpile::{TranspilationPlugin, TranspileError, TranspilerRegistry};
}

// Also export at crate root for convenience
pub use catalog::Catalog;
pub use dialect::Dialect;
pub use error::{JunctionError, JunctionResult};
pub use graph::NodeGraph;
pub use semantic::{build_query, get_dimensions, get_shared_dimensions, GeneratedSql};
