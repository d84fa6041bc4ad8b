//! # Store Error Types
//!
//! Classification of persistence failures. Transient errors leave queue items
//! in place for the next poll; permanent errors remove them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Store unreachable, timed out, or aborted by concurrency control
    #[error("Transient store error: {message}")]
    Transient { message: String },

    /// Foreign key, uniqueness, or check constraint violated
    #[error("Constraint violation: {message}")]
    Constraint { message: String },

    /// Operator no longer ACTIVE or already at its workload limit
    #[error("Operator {operator_id} has no remaining capacity")]
    CapacityExhausted { operator_id: String },

    /// Complaint already has an agent or managing admin
    #[error("Complaint {complaint_id} is already assigned")]
    AlreadyAssigned { complaint_id: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// Stored data could not be mapped onto the domain model
    #[error("Store serialization error: {message}")]
    Serialization { message: String },

    /// Statement refers to a missing table or column, or is otherwise invalid
    #[error("Store schema error: {message}")]
    Schema { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },
}

impl StoreError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    pub fn capacity_exhausted(operator_id: impl ToString) -> Self {
        Self::CapacityExhausted {
            operator_id: operator_id.to_string(),
        }
    }

    pub fn already_assigned(complaint_id: impl ToString) -> Self {
        Self::AlreadyAssigned {
            complaint_id: complaint_id.to_string(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Worth retrying later with the same input
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Retrying with the same input cannot succeed
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Constraint { .. } | Self::Serialization { .. } | Self::Schema { .. }
        )
    }
}

/// PostgreSQL SQLSTATE codes treated as permanent constraint failures
const CONSTRAINT_CODES: &[&str] = &["23502", "23503", "23505", "23514", "22P02"];

/// SQLSTATE class 42: syntax error or access rule violation
const SCHEMA_CLASS: &str = "42";

/// Map a database-reported SQLSTATE onto a store error
pub fn classify_sqlstate(code: &str, message: &str) -> StoreError {
    if CONSTRAINT_CODES.contains(&code) {
        StoreError::constraint(format!("{message} ({code})"))
    } else if code.starts_with(SCHEMA_CLASS) {
        StoreError::schema(format!("{message} ({code})"))
    } else {
        StoreError::transient(format!("{message} ({code})"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
                classify_sqlstate(&code, db_err.message())
            }
            sqlx::Error::RowNotFound => StoreError::not_found("row", "query"),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::TypeNotFound { .. } => StoreError::serialization(err.to_string()),
            _ => StoreError::transient(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration {
            message: err.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(StoreError::transient("pool timed out").is_transient());
        assert!(!StoreError::transient("pool timed out").is_permanent());
        assert!(StoreError::constraint("fk").is_permanent());
        assert!(!StoreError::capacity_exhausted("a1").is_transient());
        assert!(!StoreError::capacity_exhausted("a1").is_permanent());
    }

    #[test]
    fn test_sqlx_errors_map_to_categories() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_transient());
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound { .. }
        ));
        assert!(StoreError::from(sqlx::Error::ColumnNotFound("seq".into())).is_permanent());
    }

    #[test]
    fn test_sqlstate_classes() {
        let undefined_table = classify_sqlstate("42P01", "relation \"complaints\" does not exist");
        assert!(matches!(undefined_table, StoreError::Schema { .. }));
        assert!(undefined_table.is_permanent());
        assert!(classify_sqlstate("42703", "column \"seq\" does not exist").is_permanent());

        assert!(matches!(
            classify_sqlstate("23505", "duplicate key"),
            StoreError::Constraint { .. }
        ));
        assert!(classify_sqlstate("40001", "could not serialize access").is_transient());
        assert!(classify_sqlstate("57P01", "terminating connection").is_transient());
    }
}
