//! Spark SQL dialect.
//!
//! The canonical dialect: node queries are authored in Spark SQL and
//! generated SQL is assembled in it before any transpilation.
//! - Backtick identifier quoting
//! - Backslash escapes inside string literals

use super::helpers;
use super::SqlDialect;

/// Spark SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Spark;

impl SqlDialect for Spark {
    fn name(&self) -> &'static str {
        "spark"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_backslash(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_spark(name)
    }
}
