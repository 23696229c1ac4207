//! Entity declarations: persisted properties, their wire names and the typed setter table used for binding.
//!
//! An entity is a plain struct whose serde representation uses the exposed (lowerCamelCase) field
//! names. Persistence metadata lives in [`Entity::properties`]; request binding goes through
//! [`Entity::setters`], so no field is ever assigned by name at runtime without a typed setter.

use crate::case::{lcfirst, to_snake_case};
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Semantic type of a property; selects coercion when binding request values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Json,
}

impl FieldType {
    /// Postgres type assumed when a column declares none.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::String => "text",
            FieldType::Integer => "bigint",
            FieldType::Float => "double precision",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "timestamptz",
            FieldType::Json => "jsonb",
        }
    }
}

/// Persistence metadata. A property without a column is not persisted and never exposed.
#[derive(Clone, Debug, Default)]
pub struct Column {
    pub default: Option<Value>,
    pub autogenerated: bool,
    /// Explicit SQL column name; defaults to the snake_case of the exposed name.
    pub sql_name: Option<String>,
    /// Explicit SQL type used for parameter casts; defaults from the field type.
    pub sql_type: Option<String>,
    pub primary_key: bool,
}

#[derive(Clone, Debug)]
pub struct Property {
    /// Name as declared on the type (first character is lower-cased on the wire).
    pub name: String,
    pub field_type: FieldType,
    /// Whether the storage type accepts null (an `Option<_>` field).
    pub nullable: bool,
    pub column: Option<Column>,
    /// Never read from request bodies, never written to responses.
    pub ignore: bool,
}

impl Property {
    /// A declared property without persistence metadata.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Property {
            name: name.into(),
            field_type,
            nullable: false,
            column: None,
            ignore: false,
        }
    }

    /// A persisted property.
    pub fn column(name: impl Into<String>, field_type: FieldType) -> Self {
        let mut p = Self::new(name, field_type);
        p.column = Some(Column::default());
        p
    }

    /// Autogenerated primary key column.
    pub fn id(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::column(name, field_type).primary_key().autogenerated()
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.column.get_or_insert_with(Column::default).default = Some(value.into());
        self
    }

    pub fn autogenerated(mut self) -> Self {
        self.column.get_or_insert_with(Column::default).autogenerated = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.column.get_or_insert_with(Column::default).primary_key = true;
        self
    }

    pub fn sql_name(mut self, sql_name: impl Into<String>) -> Self {
        self.column.get_or_insert_with(Column::default).sql_name = Some(sql_name.into());
        self
    }

    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.column.get_or_insert_with(Column::default).sql_type = Some(sql_type.into());
        self
    }

    /// Field name in request and response bodies.
    pub fn exposed_name(&self) -> String {
        lcfirst(&self.name)
    }

    pub fn is_persisted(&self) -> bool {
        self.column.is_some()
    }

    pub fn is_primary_key(&self) -> bool {
        self.column.as_ref().is_some_and(|c| c.primary_key)
    }

    pub fn is_autogenerated(&self) -> bool {
        self.column.as_ref().is_some_and(|c| c.autogenerated)
    }

    pub fn column_name(&self) -> String {
        self.column
            .as_ref()
            .and_then(|c| c.sql_name.clone())
            .unwrap_or_else(|| to_snake_case(&self.exposed_name()))
    }

    pub fn column_type(&self) -> String {
        self.column
            .as_ref()
            .and_then(|c| c.sql_type.clone())
            .unwrap_or_else(|| self.field_type.sql_type().to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("null is not allowed")]
    NullNotAllowed,
    #[error("type mismatch: {0}")]
    Mismatch(String),
}

/// A coerced request value on its way into a setter.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Json(Value),
    DateTime(DateTime<FixedOffset>),
}

impl FieldValue {
    /// Deserialize into the property's Rust type. Null into a non-`Option` type is `NullNotAllowed`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, BindError> {
        match self {
            FieldValue::Null => serde_json::from_value(Value::Null).map_err(|_| BindError::NullNotAllowed),
            FieldValue::Json(v) => serde_json::from_value(v).map_err(|e| BindError::Mismatch(e.to_string())),
            FieldValue::DateTime(dt) => serde_json::from_value(Value::String(dt.to_rfc3339()))
                .map_err(|e| BindError::Mismatch(e.to_string())),
        }
    }
}

pub type Setter<E> = fn(&mut E, FieldValue) -> Result<(), BindError>;

/// Exposed field name -> typed setter. Built once per entity type.
pub struct SetterTable<E> {
    setters: HashMap<String, Setter<E>>,
}

impl<E> Default for SetterTable<E> {
    fn default() -> Self {
        SetterTable {
            setters: HashMap::new(),
        }
    }
}

impl<E> SetterTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, setter: Setter<E>) -> Self {
        self.setters.insert(name.into(), setter);
        self
    }

    pub fn get(&self, name: &str) -> Option<Setter<E>> {
        self.setters.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.setters.contains_key(name)
    }
}

/// A persisted record exposed through generated routes.
pub trait Entity: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Unique type name; may be `::`-qualified. The short name drives the default path segment.
    const TYPE_NAME: &'static str;

    /// Declared properties, in declaration order.
    fn properties() -> Vec<Property>;

    fn setters() -> SetterTable<Self>;
}

/// Serialize an entity for the wire, dropping ignored properties.
pub fn wire_value<E: Serialize>(entity: &E, properties: &[Property]) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(entity)?;
    if let Value::Object(map) = &mut value {
        for p in properties.iter().filter(|p| p.ignore) {
            map.remove(&p.exposed_name());
        }
    }
    Ok(value)
}
