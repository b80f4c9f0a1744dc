//! Service-layer error type.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl ServiceError {
    /// Whether retrying the same call unchanged could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            // A locked database or transient I/O can clear up on retry.
            ServiceError::Db(_) | ServiceError::Storage(_) => true,
            ServiceError::Auth(_)
            | ServiceError::NotFound(_)
            | ServiceError::Validation(_)
            | ServiceError::Conflict(_) => false,
        }
    }

    /// Short operator-facing hint shown alongside the error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            ServiceError::Auth(_) => Some("Check the credentials and sign in again"),
            ServiceError::Validation(_) => Some("Correct the highlighted input and retry"),
            ServiceError::Conflict(_) => None,
            ServiceError::NotFound(_) => None,
            ServiceError::Storage(_) => Some("Check free disk space under the data directory"),
            ServiceError::Db(_) => Some("Retry; if it persists, check the database file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_split() {
        assert!(!ServiceError::Validation("empty content".into()).is_retryable());
        assert!(!ServiceError::Conflict("already connected".into()).is_retryable());
        assert!(ServiceError::Storage("disk full".into()).is_retryable());
    }

    #[test]
    fn test_db_error_converts() {
        let err: ServiceError = DbError::Migration("bad".into()).into();
        assert!(matches!(err, ServiceError::Db(_)));
    }
}
