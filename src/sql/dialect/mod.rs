//! SQL Dialect definitions and formatting rules.
//!
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `` ` `` (Spark), `"` (Trino/Druid/Postgres/DuckDB)
//! - String literal escaping: backslash (Spark) vs doubled quote
//! - Function names: `DATE_FORMAT` vs `FORMAT_DATETIME` vs `TO_CHAR`
//!
//! Spark is the canonical dialect: generated SQL is assembled in Spark SQL
//! and only then handed to a transpilation plugin.
//!
//! # Usage
//!
//! ```ignore
//! use junction::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Trino;
//! let quoted = dialect.quote_identifier("user");  // "user"
//! ```

mod druid;
mod duckdb;
pub mod helpers;
mod postgres;
mod spark;
mod trino;

pub use druid::Druid;
pub use duckdb::DuckDb;
pub use postgres::Postgres;
pub use spark::Spark;
pub use trino::Trino;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{DuckDbDialect, GenericDialect, PostgreSqlDialect};

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Character that delimits a quoted identifier.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Quote a string literal.
    ///
    /// Defaults to single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a NULL literal.
    fn format_null(&self) -> &'static str {
        "NULL"
    }

    /// Remap a function name for this dialect.
    ///
    /// Returns `Some(new_name)` if the function should be remapped, `None` to keep original.
    /// The input is matched case-insensitively.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Spark,
    Trino,
    Druid,
    Postgres,
    DuckDb,
}

impl Dialect {
    /// All supported dialects, canonical first.
    pub const ALL: [Dialect; 5] = [
        Dialect::Spark,
        Dialect::Trino,
        Dialect::Druid,
        Dialect::Postgres,
        Dialect::DuckDb,
    ];

    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Spark => &Spark,
            Dialect::Trino => &Trino,
            Dialect::Druid => &Druid,
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
        }
    }

    /// The sqlparser dialect used to read SQL written in this dialect.
    pub fn parser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        match self {
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
            Dialect::DuckDb => Box::new(DuckDbDialect {}),
            // sqlparser has no Spark, Trino or Druid dialect; the generic one
            // accepts both backtick and double-quoted identifiers.
            Dialect::Spark | Dialect::Trino | Dialect::Druid => Box::new(GenericDialect {}),
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn identifier_quote(&self) -> char {
        self.dialect().identifier_quote()
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_null(&self) -> &'static str {
        self.dialect().format_null()
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

/// Error returned when a dialect name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown SQL dialect: '{0}'")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spark" | "sparksql" | "spark_sql" => Ok(Dialect::Spark),
            "trino" | "presto" => Ok(Dialect::Trino),
            "druid" => Ok(Dialect::Druid),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}
