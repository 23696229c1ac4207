//! Binding request bodies onto entities through the typed setter table.

use crate::config::FieldDescriptor;
use crate::entity::{BindError, FieldType, FieldValue, SetterTable};
use crate::error::WriteOp;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

/// The only accepted timestamp shape, e.g. `2024-09-11T20:34:25+02:00`.
pub const W3C_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Parse a W3C timestamp; a trailing `Z` stands for `+00:00`.
pub fn parse_w3c(s: &str) -> Option<DateTime<FixedOffset>> {
    match s.strip_suffix('Z') {
        Some(local) => DateTime::parse_from_str(&format!("{}+00:00", local), W3C_FORMAT).ok(),
        None => DateTime::parse_from_str(s, W3C_FORMAT).ok(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindFailure {
    InvalidDate { field: String, date: String },
    NullNotAllowed { field: String },
    Mismatch { field: String, message: String },
}

fn coerce(field: &FieldDescriptor, raw: &Value) -> Result<FieldValue, BindFailure> {
    match (field.field_type, raw) {
        (_, Value::Null) => Ok(FieldValue::Null),
        (FieldType::DateTime, Value::String(s)) => {
            parse_w3c(s)
                .map(FieldValue::DateTime)
                .ok_or_else(|| BindFailure::InvalidDate {
                    field: field.name.clone(),
                    date: s.clone(),
                })
        }
        (FieldType::DateTime, other) => Err(BindFailure::InvalidDate {
            field: field.name.clone(),
            date: other.to_string(),
        }),
        (_, v) => Ok(FieldValue::Json(v.clone())),
    }
}

/// Assign each declared field that has a setter, in declaration order.
/// Present body values win; on create, absent fields fall back to their declared default.
pub fn bind_fields<E>(
    setters: &SetterTable<E>,
    fields: &[FieldDescriptor],
    body: Option<&Map<String, Value>>,
    op: WriteOp,
    entity: &mut E,
) -> Result<(), BindFailure> {
    for field in fields {
        let Some(setter) = setters.get(&field.name) else {
            continue;
        };
        let raw = match body.and_then(|b| b.get(&field.name)) {
            Some(v) => v,
            None => match (&field.default, op) {
                (Some(default), WriteOp::Create) if !default.is_null() => default,
                _ => continue,
            },
        };
        let value = coerce(field, raw)?;
        setter(entity, value).map_err(|e| match e {
            BindError::NullNotAllowed => BindFailure::NullNotAllowed {
                field: field.name.clone(),
            },
            BindError::Mismatch(message) => BindFailure::Mismatch {
                field: field.name.clone(),
                message,
            },
        })?;
    }
    Ok(())
}
