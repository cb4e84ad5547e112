//! Dialect transpilation plugins.
//!
//! The query builder always composes SQL in its canonical dialect. When a
//! request asks for another dialect, the canonical SQL is handed to a
//! [`TranspilationPlugin`] picked by name from a [`TranspilerRegistry`].
//!
//! # Example
//!
//! ```ignore
//! use junction::transpile::TranspilerRegistry;
//! use junction::sql::Dialect;
//!
//! let registry = TranspilerRegistry::with_builtin();
//! let plugin = registry.get_transpilation_plugin("sqlparser")?;
//! let sql = plugin.transpile("SELECT `id` FROM t", Dialect::Spark, Dialect::Trino)?;
//! assert_eq!(sql, r#"SELECT "id" FROM t"#);
//! ```

mod tokenizer;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::semantic::{SemanticError, SemanticResult};
use crate::sql::Dialect;

pub use tokenizer::SqlparserTranspiler;

/// Errors raised by a transpilation plugin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranspileError {
    #[error("cannot read {dialect} SQL: {message}")]
    Tokenize { dialect: Dialect, message: String },

    #[error("cannot transpile from {from} to {to}: {message}")]
    Unsupported {
        from: Dialect,
        to: Dialect,
        message: String,
    },
}

/// Rewrites SQL from one dialect into another.
///
/// Implementations must return the input unchanged when `from == to`.
pub trait TranspilationPlugin: Send + Sync {
    /// Name the plugin is registered and configured under.
    fn name(&self) -> &str;

    fn transpile(&self, sql: &str, from: Dialect, to: Dialect) -> Result<String, TranspileError>;
}

/// Returns its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTranspiler;

impl TranspilationPlugin for NoopTranspiler {
    fn name(&self) -> &str {
        "noop"
    }

    fn transpile(&self, sql: &str, _from: Dialect, _to: Dialect) -> Result<String, TranspileError> {
        Ok(sql.to_string())
    }
}

/// Transpilation plugins by name.
#[derive(Clone, Default)]
pub struct TranspilerRegistry {
    plugins: HashMap<String, Arc<dyn TranspilationPlugin>>,
}

impl fmt::Debug for TranspilerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranspilerRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

impl TranspilerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `noop` and `sqlparser` plugins.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NoopTranspiler));
        registry.register(Arc::new(SqlparserTranspiler));
        registry
    }

    /// Register a plugin under its own name, replacing any previous one.
    pub fn register(&mut self, plugin: Arc<dyn TranspilationPlugin>) {
        let name = plugin.name().to_string();
        if self.plugins.insert(name.clone(), plugin).is_some() {
            log::debug!("replaced transpilation plugin {}", name);
        }
    }

    pub fn get_transpilation_plugin(&self, name: &str) -> SemanticResult<Arc<dyn TranspilationPlugin>> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| SemanticError::UnknownPlugin {
                name: name.to_string(),
            })
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
