//! Domain error for metadata lookups.

use thiserror::Error;

/// Errors surfaced by series/episode lookups.
///
/// Failures while refreshing an already-cached record are caught at the
/// resolver boundary and logged; the stale record is returned instead.
/// Failures during initial population propagate to the caller.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Invalid lookup arguments: {0}")]
    InvalidArgument(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("TVDB request failed: {0}")]
    Remote(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl LookupError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.to_string())
    }
}
