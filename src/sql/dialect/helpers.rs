//! Shared helper functions for SQL dialect implementations.
//!
//! Dialects compose these to implement `SqlDialect` with minimal duplication.

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Trino, Druid, Postgres, DuckDB
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: Spark
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with single quotes, escaping with backslashes.
/// Used by: Spark, where `\` is an escape character inside literals.
pub fn quote_string_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

// =============================================================================
// Function Remapping
// =============================================================================

/// Remap functions for Spark SQL.
pub fn remap_function_spark(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRFTIME" => Some("DATE_FORMAT"),
        "TO_CHAR" => Some("DATE_FORMAT"),
        "FORMAT_DATETIME" => Some("DATE_FORMAT"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "APPROX_DISTINCT" => Some("APPROX_COUNT_DISTINCT"),
        _ => None,
    }
}

/// Remap functions for Trino.
pub fn remap_function_trino(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "DATE_FORMAT" => Some("FORMAT_DATETIME"),
        "STRFTIME" => Some("FORMAT_DATETIME"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "APPROX_COUNT_DISTINCT" => Some("APPROX_DISTINCT"),
        "SIZE" => Some("CARDINALITY"),
        _ => None,
    }
}

/// Remap functions for Druid SQL.
pub fn remap_function_druid(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "DATE_FORMAT" => Some("TIME_FORMAT"),
        "STRFTIME" => Some("TIME_FORMAT"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "APPROX_DISTINCT" => Some("APPROX_COUNT_DISTINCT"),
        _ => None,
    }
}

/// Remap functions for Postgres.
pub fn remap_function_postgres(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRFTIME" => Some("TO_CHAR"),
        "DATE_FORMAT" => Some("TO_CHAR"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "SIZE" => Some("CARDINALITY"),
        _ => None,
    }
}

/// Remap functions for DuckDB.
pub fn remap_function_duckdb(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "TO_CHAR" => Some("STRFTIME"),
        "DATE_FORMAT" => Some("STRFTIME"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "APPROX_DISTINCT" => Some("APPROX_COUNT_DISTINCT"),
        "SIZE" => Some("LEN"),
        _ => None,
    }
}
