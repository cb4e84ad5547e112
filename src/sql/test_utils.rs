//! Test utilities for SQL emission validation.
//!
//! Provides helpers for validating that emitted SQL is syntactically correct
//! using sqlparser-rs for roundtrip validation.

use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Validates that a SQL string is syntactically valid for the given dialect.
///
/// # Example
///
/// ```ignore
/// use crate::sql::test_utils::validate_sql;
/// use crate::sql::dialect::Dialect;
///
/// let sql = "SELECT * FROM users";
/// validate_sql(sql, Dialect::Postgres).unwrap();
/// ```
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect = dialect.parser_dialect();

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {}: {}\nSQL: {}", dialect, e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::expr::{col, table_col, ExprExt};
    use crate::sql::query::{Cte, Query, TableRef};

    #[test]
    fn test_validate_valid_sql() {
        validate_sql("SELECT * FROM users", Dialect::Postgres).unwrap();
        validate_sql("SELECT * FROM users", Dialect::Spark).unwrap();
        validate_sql("SELECT * FROM users", Dialect::DuckDb).unwrap();
    }

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("SELEC * FORM users", Dialect::Postgres);
        assert!(result.is_err());
    }

    #[test]
    fn test_built_query_parses_in_every_dialect() {
        let query = Query::new()
            .with_cte(Cte::raw("orders", "SELECT id, customer_id FROM raw_orders"))
            .select(vec![table_col("o", "id"), table_col("c", "region")])
            .from(TableRef::new("orders").with_alias("o"))
            .left_join(
                TableRef::qualified(["warehouse", "crm", "customers"]).with_alias("c"),
                table_col("o", "customer_id").eq(table_col("c", "id")),
            )
            .filter(col("region").eq("west"));

        for dialect in Dialect::ALL {
            validate_sql(&query.to_sql(dialect), dialect).unwrap();
        }
    }
}
