use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
    },

    #[error("persistence error: {message}")]
    PersistenceError {
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("operator {operator} is not authorized to {action}")]
    Unauthorized {
        operator: String,
        action: String,
    },

    #[error("serialization error: {message}")]
    Serialization {
        message: String,
    },
}

impl LedgerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        LedgerError::PersistenceError {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// only store failures may be retried; the materializer leaves no partial state behind
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::PersistenceError { .. })
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::persistence(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_errors_are_retryable() {
        assert!(LedgerError::persistence("connection reset").is_retryable());
        assert!(!LedgerError::invalid("duration must be positive").is_retryable());
        assert!(!LedgerError::not_found("loan", "abc").is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        let err = LedgerError::not_found("installment", 42);
        assert_eq!(err.to_string(), "installment not found: 42");
    }
}
