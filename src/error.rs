use thiserror::Error;

use crate::catalog::CatalogError;

/// Failures surfaced by the engine's public operations.
///
/// Empty results are values, never errors: an empty detection list, an empty
/// weak-area partition, and an empty recommendation list are all valid
/// terminal states and must stay distinguishable from a backend fault.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("content catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("attempt store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        Self::CatalogUnavailable(err.to_string())
    }
}
