use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Row not found: {0}")]
    RowNotFound(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl DbError {
    /// True for failures raised by the storage layer rather than by argument checks.
    pub fn is_data_access(&self) -> bool {
        !matches!(self, DbError::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_access_classification() {
        assert!(!DbError::InvalidArgument("x".into()).is_data_access());
        assert!(DbError::RowNotFound("x".into()).is_data_access());
        assert!(DbError::ConstraintViolation("x".into()).is_data_access());
        assert!(DbError::LockError("x".into()).is_data_access());
    }

    #[test]
    fn test_error_display() {
        let err = DbError::TableNotFound("allocation".into());
        assert_eq!(err.to_string(), "Table 'allocation' not found");
    }
}
