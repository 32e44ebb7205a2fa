use thiserror::Error;

/// Failures reported by a [`RemoteStore`](crate::RemoteStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no authenticated user")]
    Unauthenticated,

    #[error("{table} record '{id}' not found")]
    NotFound { table: &'static str, id: String },

    /// Unique-key violation, e.g. a second "ensure user" racing the first.
    #[error("{table} record '{id}' already exists")]
    Duplicate { table: &'static str, id: String },

    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
