//! Typed errors and their default HTTP status codes.

use crate::capability::{Capability, StoreError};
use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("manifest {path}: {message}")]
    Manifest { path: String, message: String },
    #[error("unknown entity type: {0}")]
    UnknownEntity(String),
    #[error("unknown middleware: {0}")]
    UnknownMiddleware(String),
    #[error("middleware {name}: {message}")]
    Middleware { name: String, message: String },
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("validation: {0}")]
    Validation(String),
    #[error("environment: {0}")]
    Env(String),
    #[error("route cache: {0}")]
    Cache(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct NotFound {
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct MissingFields {
    pub fields: Vec<String>,
}

/// A null reached a column that does not accept it, either in memory while binding or in the store.
#[derive(Clone, Debug)]
pub struct ColumnIsNull {
    /// Set when the violation was caught while binding a request field.
    pub column: Option<String>,
    pub message: String,
    /// Partially populated entity, for diagnostics.
    pub entity: Option<Value>,
}

/// A unique or reference constraint rejected a write.
#[derive(Clone, Debug)]
pub struct ConstraintFailed {
    pub message: String,
    pub entity: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct InvalidDateFormat {
    pub field: String,
    pub date: String,
}

#[derive(Clone, Debug)]
pub struct Internal {
    pub message: String,
}

/// Every failure a request handler can produce. None of these escape the handler; each renders to a response.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("not found: {}", .0.message)]
    NotFound(NotFound),
    #[error("required fields are missing: {}", .0.fields.join(", "))]
    MissingFields(MissingFields),
    #[error("column is null: {}", .0.message)]
    CreateColumnIsNull(ColumnIsNull),
    #[error("unique constraint failed: {}", .0.message)]
    CreateUniqueFailed(ConstraintFailed),
    #[error("reference failed: {}", .0.message)]
    CreateReferenceFailed(ConstraintFailed),
    #[error("column is null: {}", .0.message)]
    UpdateColumnIsNull(ColumnIsNull),
    #[error("unique constraint failed: {}", .0.message)]
    UpdateUniqueFailed(ConstraintFailed),
    #[error("reference failed: {}", .0.message)]
    UpdateReferenceFailed(ConstraintFailed),
    #[error("entity is referenced: {}", .0.message)]
    DeleteReferenced(ConstraintFailed),
    #[error("invalid date format for {}: {}", .0.field, .0.date)]
    InvalidDateFormat(InvalidDateFormat),
    #[error("internal: {}", .0.message)]
    Internal(Internal),
}

/// Which write produced a store error; selects the create or update variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(NotFound { message: message.into() })
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(Internal { message: message.into() })
    }

    /// Wiring defect: a route exists for a capability the entity's binding does not implement.
    pub fn capability_missing(type_name: &str, capability: Capability) -> Self {
        Self::internal(format!("entity {} does not implement {}", type_name, capability))
    }

    pub fn column_is_null(op: WriteOp, column: Option<String>, message: String, entity: Option<Value>) -> Self {
        let payload = ColumnIsNull { column, message, entity };
        match op {
            WriteOp::Create => ApiError::CreateColumnIsNull(payload),
            WriteOp::Update => ApiError::UpdateColumnIsNull(payload),
        }
    }

    /// Map a failed create/update into the taxonomy.
    pub fn from_write(op: WriteOp, err: StoreError, entity: Option<Value>) -> Self {
        match err {
            StoreError::UniqueViolation(message) => {
                let payload = ConstraintFailed { message, entity };
                match op {
                    WriteOp::Create => ApiError::CreateUniqueFailed(payload),
                    WriteOp::Update => ApiError::UpdateUniqueFailed(payload),
                }
            }
            StoreError::ForeignKeyViolation(message) => {
                let payload = ConstraintFailed { message, entity };
                match op {
                    WriteOp::Create => ApiError::CreateReferenceFailed(payload),
                    WriteOp::Update => ApiError::UpdateReferenceFailed(payload),
                }
            }
            StoreError::NotNullViolation(message) => Self::column_is_null(op, None, message, entity),
            StoreError::Other(message) => Self::internal(message),
        }
    }

    /// Map a failed delete into the taxonomy.
    pub fn from_delete(err: StoreError, entity: Option<Value>) -> Self {
        match err {
            StoreError::ForeignKeyViolation(message) => ApiError::DeleteReferenced(ConstraintFailed { message, entity }),
            other => Self::internal(other.to_string()),
        }
    }

    /// Default status used when no override renders the error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MissingFields(_)
            | ApiError::CreateColumnIsNull(_)
            | ApiError::UpdateColumnIsNull(_)
            | ApiError::InvalidDateFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::CreateUniqueFailed(_)
            | ApiError::CreateReferenceFailed(_)
            | ApiError::UpdateUniqueFailed(_)
            | ApiError::UpdateReferenceFailed(_)
            | ApiError::DeleteReferenced(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::MissingFields(_) => "missing_fields",
            ApiError::CreateColumnIsNull(_) => "create_column_is_null",
            ApiError::CreateUniqueFailed(_) => "create_unique_failed",
            ApiError::CreateReferenceFailed(_) => "create_reference_failed",
            ApiError::UpdateColumnIsNull(_) => "update_column_is_null",
            ApiError::UpdateUniqueFailed(_) => "update_unique_failed",
            ApiError::UpdateReferenceFailed(_) => "update_reference_failed",
            ApiError::DeleteReferenced(_) => "delete_referenced",
            ApiError::InvalidDateFormat(_) => "invalid_date_format",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::unique(StoreError::UniqueViolation("u".into()), StatusCode::CONFLICT, "create_unique_failed")]
    #[case::reference(StoreError::ForeignKeyViolation("f".into()), StatusCode::CONFLICT, "create_reference_failed")]
    #[case::not_null(StoreError::NotNullViolation("n".into()), StatusCode::BAD_REQUEST, "create_column_is_null")]
    #[case::other(StoreError::Other("o".into()), StatusCode::INTERNAL_SERVER_ERROR, "internal_error")]
    fn create_failures_are_classified(#[case] err: StoreError, #[case] status: StatusCode, #[case] code: &str) {
        let e = ApiError::from_write(WriteOp::Create, err, None);
        assert_eq!(e.status(), status);
        assert_eq!(e.code(), code);
    }

    #[test]
    fn update_failures_use_update_variants() {
        let e = ApiError::from_write(WriteOp::Update, StoreError::UniqueViolation("u".into()), None);
        assert!(matches!(e, ApiError::UpdateUniqueFailed(_)));
        let e = ApiError::from_write(WriteOp::Update, StoreError::ForeignKeyViolation("f".into()), None);
        assert!(matches!(e, ApiError::UpdateReferenceFailed(_)));
    }

    #[test]
    fn delete_reference_is_conflict() {
        let e = ApiError::from_delete(StoreError::ForeignKeyViolation("fk".into()), None);
        assert_eq!(e.status(), StatusCode::CONFLICT);
        let e = ApiError::from_delete(StoreError::UniqueViolation("u".into()), None);
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_fields_message_lists_fields() {
        let e = ApiError::MissingFields(MissingFields {
            fields: vec!["name".into(), "date".into()],
        });
        assert_eq!(e.to_string(), "required fields are missing: name, date");
    }
}
