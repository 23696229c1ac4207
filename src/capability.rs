//! Capability contracts consumed from the persistence layer, and store error classification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One of the four CRUD contracts an entity type may implement and declare routes for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Findable,
    Creatable,
    Updatable,
    Deletable,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::Findable => "Findable",
            Capability::Creatable => "Creatable",
            Capability::Updatable => "Updatable",
            Capability::Deletable => "Deletable",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Exactly "DESC" (any case) sorts descending; anything else ascending.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some(s) if s.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Validated ordering for range queries. `field` is always an exposed field name of the entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderClause {
    pub field: String,
    pub direction: SortDirection,
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_sql())
    }
}

/// Failure reported by a persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("not-null constraint violated: {0}")]
    NotNullViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("store: {0}")]
    Other(String),
}

impl StoreError {
    /// Classify a Postgres SQLSTATE. Postgres reports unique, not-null and reference failures under
    /// their own codes; only the bare integrity class 23000 is ambiguous and is read as a reference
    /// failure. Drivers that overload 23000 (MySQL's 1062/1452) need their own classification.
    pub fn from_pg_sqlstate(code: &str, message: String) -> Self {
        match code {
            "23505" => StoreError::UniqueViolation(message),
            "23502" => StoreError::NotNullViolation(message),
            "23503" | "23000" => StoreError::ForeignKeyViolation(message),
            _ => StoreError::Other(message),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if let Some(code) = db.code() {
                return StoreError::from_pg_sqlstate(&code, db.message().to_string());
            }
        }
        StoreError::Other(e.to_string())
    }
}

#[async_trait]
pub trait Findable<E>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// `count: None` means unbounded.
    async fn find_range(&self, offset: u64, count: Option<u64>, order: &OrderClause) -> Result<Vec<E>, StoreError>;

    async fn count_all(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait Creatable<E>: Send + Sync {
    /// Insert; server-assigned fields are written back into `entity`.
    async fn create(&self, entity: &mut E) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Updatable<E>: Send + Sync {
    async fn update(&self, entity: &mut E) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Deletable<E>: Send + Sync {
    async fn delete(&self, entity: &E) -> Result<(), StoreError>;
}
