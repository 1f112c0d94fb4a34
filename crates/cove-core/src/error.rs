use thiserror::Error;

/// Errors surfaced by the persistence layer.
///
/// Stale-write rejections are NOT errors - stores report those as `Ok(false)`
/// so callers can tell an expected race from a broken database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
