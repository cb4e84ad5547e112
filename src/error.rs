//! Top-level error for callers that load a catalog, read settings and build SQL.

use crate::catalog::CatalogError;
use crate::config::SettingsError;
use crate::semantic::SemanticError;
use crate::sql::UnknownDialect;
use crate::transpile::TranspileError;

#[derive(Debug, thiserror::Error)]
pub enum JunctionError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Transpile(#[from] TranspileError),

    #[error(transparent)]
    Dialect(#[from] UnknownDialect),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

pub type JunctionResult<T> = Result<T, JunctionError>;
