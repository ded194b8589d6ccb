use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} {field} already exists: {value}")]
    Conflict {
        entity_type: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Coarse classification of a [`RepositoryError`] as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A lookup or mutation targeted a record that does not exist.
    NotFound,
    /// A unique field collided with an existing record.
    Conflict,
    /// The backing store failed; the cause is in the error message.
    Store,
}

impl RepositoryError {
    /// Shorthand for a [`RepositoryError::NotFound`] keyed by a displayable id.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`RepositoryError::Conflict`] on a unique field.
    pub fn conflict(entity_type: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::Conflict {
            entity_type,
            field,
            value: value.to_string(),
        }
    }

    /// Returns the caller-facing classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::NotFound { .. } => ErrorKind::NotFound,
            RepositoryError::Conflict { .. } => ErrorKind::Conflict,
            RepositoryError::ConnectionFailed(_)
            | RepositoryError::QueryFailed(_)
            | RepositoryError::Serialization(_)
            | RepositoryError::InvalidData(_) => ErrorKind::Store,
        }
    }

    /// Returns true if the error originated in the backing store itself.
    pub fn is_store_error(&self) -> bool {
        self.kind() == ErrorKind::Store
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
