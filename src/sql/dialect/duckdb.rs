//! DuckDB SQL dialect.
//!
//! PostgreSQL-compatible quoting with DuckDB function names
//! (`STRFTIME`, `APPROX_COUNT_DISTINCT`).

use super::helpers;
use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_duckdb(name)
    }
}
