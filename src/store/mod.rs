//! Postgres-backed implementations of the capability contracts.

mod postgres;
pub use postgres::{row_to_json, PgRepository};
