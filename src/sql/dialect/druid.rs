//! Apache Druid SQL dialect.

use super::helpers;
use super::SqlDialect;

/// Druid SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Druid;

impl SqlDialect for Druid {
    fn name(&self) -> &'static str {
        "druid"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_druid(name)
    }
}
