//! `PgRepository<E>`: sqlx implementation of Findable, Creatable, Updatable and Deletable for one
//! entity table. Rows are decoded to JSON keyed by exposed field name, then deserialised into `E`.

use crate::capability::{Creatable, Deletable, Findable, OrderClause, StoreError, Updatable};
use crate::entity::Entity;
use crate::sql::{ColumnSpec, PgBindValue, QueryBuf, TableSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use std::marker::PhantomData;

const INTEGER_TYPES: &[&str] = &["smallint", "integer", "int", "int2", "int4", "int8", "bigint", "serial", "bigserial"];

pub struct PgRepository<E> {
    pool: PgPool,
    table: TableSpec,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> PgRepository<E> {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        PgRepository {
            pool,
            table: TableSpec::from_properties(table, &E::properties()),
            _entity: PhantomData,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.table = self.table.with_schema(schema);
        self
    }

    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    fn pk(&self) -> Result<&ColumnSpec, StoreError> {
        self.table
            .primary_key()
            .ok_or_else(|| StoreError::Other(format!("{} has no primary key column", E::TYPE_NAME)))
    }

    /// Path ids arrive as strings; integer keys that do not parse cannot match any row.
    fn id_value(pk: &ColumnSpec, id: &str) -> Option<Value> {
        if INTEGER_TYPES.contains(&pk.sql_type.as_str()) {
            id.parse::<i64>().ok().map(Value::from)
        } else {
            Some(Value::String(id.to_string()))
        }
    }

    fn to_map(entity: &E) -> Result<Map<String, Value>, StoreError> {
        match serde_json::to_value(entity) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Other(format!("{} does not serialise to an object", E::TYPE_NAME))),
            Err(e) => Err(StoreError::Other(e.to_string())),
        }
    }

    fn decode(row: Value) -> Result<E, StoreError> {
        serde_json::from_value(row).map_err(|e| StoreError::Other(format!("decode {}: {}", E::TYPE_NAME, e)))
    }

    fn query(q: &QueryBuf) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, StoreError> {
        let row = Self::query(q).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, StoreError> {
        let rows = Self::query(q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Run a write that returns the stored row and copy it back into `entity`.
    async fn write_back(&self, q: &QueryBuf, entity: &mut E) -> Result<(), StoreError> {
        let row = self
            .fetch_optional(q)
            .await?
            .ok_or_else(|| StoreError::Other(format!("{} write returned no row", E::TYPE_NAME)))?;
        *entity = Self::decode(row)?;
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> Findable<E> for PgRepository<E> {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError> {
        let pk = self.pk()?;
        let Some(id) = Self::id_value(pk, id) else {
            return Ok(None);
        };
        let q = self.table.select_by_id(pk, id);
        self.fetch_optional(&q).await?.map(Self::decode).transpose()
    }

    async fn find_range(&self, offset: u64, count: Option<u64>, order: &OrderClause) -> Result<Vec<E>, StoreError> {
        let q = self.table.select_range(offset, count, order);
        self.fetch_all(&q).await?.into_iter().map(Self::decode).collect()
    }

    async fn count_all(&self) -> Result<u64, StoreError> {
        use sqlx::Row;
        let q = self.table.count_all();
        let row = Self::query(&q).fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl<E: Entity> Creatable<E> for PgRepository<E> {
    async fn create(&self, entity: &mut E) -> Result<(), StoreError> {
        let q = self.table.insert(&Self::to_map(entity)?);
        self.write_back(&q, entity).await
    }
}

#[async_trait]
impl<E: Entity> Updatable<E> for PgRepository<E> {
    async fn update(&self, entity: &mut E) -> Result<(), StoreError> {
        let q = self.table.update(self.pk()?, &Self::to_map(entity)?);
        self.write_back(&q, entity).await
    }
}

#[async_trait]
impl<E: Entity> Deletable<E> for PgRepository<E> {
    async fn delete(&self, entity: &E) -> Result<(), StoreError> {
        let pk = self.pk()?;
        let id = Self::to_map(entity)?.remove(&pk.exposed).unwrap_or(Value::Null);
        let q = self.table.delete(pk, id);
        Self::query(&q).execute(&self.pool).await?;
        Ok(())
    }
}

/// Decode a row into a JSON object keyed by column label.
pub fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
