//! Error taxonomy surfaced to calling services.

use thiserror::Error;

use crate::keys::KeyError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} is blocked: {id}")]
    Blocked { entity: &'static str, id: String },

    #[error("Show already exists: {0}")]
    DuplicateShow(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid key: {0}")]
    Key(#[from] KeyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn blocked(entity: &'static str, id: impl Into<String>) -> Self {
        Error::Blocked {
            entity,
            id: id.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Error::Forbidden(reason.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Whether a booking attempt lost a race and may be retried from the top.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Storage(e) => e.is_condition_failure() || e.is_conflict(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CancelReason;

    #[test]
    fn test_retryable_classification() {
        let canceled = Error::Storage(StorageError::TransactionCanceled {
            reasons: vec![CancelReason::None, CancelReason::ConditionFailed],
        });
        assert!(canceled.is_retryable());
        assert!(Error::Storage(StorageError::Conflict("busy".to_string())).is_retryable());

        assert!(!Error::Validation(ValidationError::NoSeats).is_retryable());
        assert!(!Error::Storage(StorageError::Backend("down".to_string())).is_retryable());
        assert!(!Error::not_found("show", "s1").is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::not_found("show", "s1").to_string(), "show not found: s1");
        assert_eq!(
            Error::Validation(ValidationError::SeatAlreadyBooked("A1".to_string())).to_string(),
            "seat already booked: A1"
        );
    }
}
