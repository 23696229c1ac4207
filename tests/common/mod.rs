//! Shared fixtures: an in-memory store enforcing unique, not-null and reference constraints,
//! fixture entities, and a router built from manifests in a temp dir.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    Method, Request, StatusCode,
};
use axum::Router;
use chrono::{DateTime, FixedOffset};
use entity_api_sdk::{
    entity_routes, AppState, Creatable, Deletable, Entity, EntityBinding, EntityRegistry, ErrorHandler, FieldType,
    Findable, MiddlewareRegistry, OrderClause, Property, RouteSynthesizer, RoutingTable, SetterTable, SortDirection,
    StatusErrorHandler, StoreError, Updatable,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Default)]
struct Table {
    rows: Vec<Map<String, Value>>,
    next_id: i64,
    unique: Vec<String>,
    not_null: Vec<String>,
    /// (field, referenced table)
    references: Vec<(String, String)>,
}

/// Tables of JSON rows keyed by `id`.
#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<HashMap<String, Table>>,
}

fn id_of(row: &Map<String, Value>) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

impl MemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn define(&self, table: &str, unique: &[&str], not_null: &[&str], references: &[(&str, &str)]) {
        let mut tables = self.tables.lock().unwrap();
        let t = tables.entry(table.to_string()).or_default();
        t.unique = unique.iter().map(|s| s.to_string()).collect();
        t.not_null = not_null.iter().map(|s| s.to_string()).collect();
        t.references = references.iter().map(|(f, r)| (f.to_string(), r.to_string())).collect();
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables.lock().unwrap().get(table).map_or(0, |t| t.rows.len())
    }

    fn check(tables: &HashMap<String, Table>, table: &str, row: &Map<String, Value>) -> Result<(), StoreError> {
        let Some(t) = tables.get(table) else {
            return Ok(());
        };
        for field in &t.not_null {
            if row.get(field).map_or(true, Value::is_null) {
                return Err(StoreError::NotNullViolation(format!("null value in column \"{}\"", field)));
            }
        }
        for field in &t.unique {
            let Some(value) = row.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            if t.rows.iter().any(|r| id_of(r) != id_of(row) && r.get(field) == Some(value)) {
                return Err(StoreError::UniqueViolation(format!("duplicate key value violates unique constraint on \"{}\"", field)));
            }
        }
        for (field, target) in &t.references {
            let Some(value) = row.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let exists = tables
                .get(target)
                .is_some_and(|other| other.rows.iter().any(|r| r.get("id") == Some(value)));
            if !exists {
                return Err(StoreError::ForeignKeyViolation(format!("\"{}\" references missing {}", field, target)));
            }
        }
        Ok(())
    }
}

/// In-memory implementation of all four capability contracts.
pub struct MemoryRepository<E> {
    db: Arc<MemoryDb>,
    table: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new(db: &Arc<MemoryDb>, table: &str) -> Arc<Self> {
        db.tables.lock().unwrap().entry(table.to_string()).or_default();
        Arc::new(MemoryRepository {
            db: Arc::clone(db),
            table: table.to_string(),
            _entity: PhantomData,
        })
    }

    fn to_row(entity: &E) -> Result<Map<String, Value>, StoreError> {
        match serde_json::to_value(entity) {
            Ok(Value::Object(map)) => Ok(map),
            other => Err(StoreError::Other(format!("not an object: {:?}", other))),
        }
    }

    fn from_row(row: &Map<String, Value>) -> Result<E, StoreError> {
        serde_json::from_value(Value::Object(row.clone())).map_err(|e| StoreError::Other(e.to_string()))
    }
}

#[async_trait]
impl<E: Entity> Findable<E> for MemoryRepository<E> {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError> {
        let Ok(id) = id.parse::<i64>() else {
            return Ok(None);
        };
        let tables = self.db.tables.lock().unwrap();
        let row = tables[&self.table].rows.iter().find(|r| id_of(r) == Some(id));
        row.map(Self::from_row).transpose()
    }

    async fn find_range(&self, offset: u64, count: Option<u64>, order: &OrderClause) -> Result<Vec<E>, StoreError> {
        let tables = self.db.tables.lock().unwrap();
        let mut rows: Vec<&Map<String, Value>> = tables[&self.table].rows.iter().collect();
        rows.sort_by(|a, b| {
            let o = cmp_values(a.get(&order.field), b.get(&order.field));
            match order.direction {
                SortDirection::Asc => o,
                SortDirection::Desc => o.reverse(),
            }
        });
        rows.into_iter()
            .skip(offset as usize)
            .take(count.map_or(usize::MAX, |c| c as usize))
            .map(Self::from_row)
            .collect()
    }

    async fn count_all(&self) -> Result<u64, StoreError> {
        Ok(self.db.len(&self.table) as u64)
    }
}

#[async_trait]
impl<E: Entity> Creatable<E> for MemoryRepository<E> {
    async fn create(&self, entity: &mut E) -> Result<(), StoreError> {
        let mut row = Self::to_row(entity)?;
        let mut tables = self.db.tables.lock().unwrap();
        let id = tables[&self.table].next_id + 1;
        row.insert("id".into(), Value::from(id));
        MemoryDb::check(&tables, &self.table, &row)?;
        let t = tables.get_mut(&self.table).ok_or_else(|| StoreError::Other("no table".into()))?;
        t.next_id = id;
        *entity = Self::from_row(&row)?;
        t.rows.push(row);
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> Updatable<E> for MemoryRepository<E> {
    async fn update(&self, entity: &mut E) -> Result<(), StoreError> {
        let row = Self::to_row(entity)?;
        let mut tables = self.db.tables.lock().unwrap();
        MemoryDb::check(&tables, &self.table, &row)?;
        let t = tables.get_mut(&self.table).ok_or_else(|| StoreError::Other("no table".into()))?;
        let slot = t
            .rows
            .iter_mut()
            .find(|r| id_of(r) == id_of(&row))
            .ok_or_else(|| StoreError::Other("row vanished".into()))?;
        *slot = row;
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> Deletable<E> for MemoryRepository<E> {
    async fn delete(&self, entity: &E) -> Result<(), StoreError> {
        let row = Self::to_row(entity)?;
        let id = row.get("id").cloned().unwrap_or(Value::Null);
        let mut tables = self.db.tables.lock().unwrap();
        let referenced = tables.values().any(|t| {
            t.references
                .iter()
                .filter(|(_, target)| *target == self.table)
                .any(|(field, _)| t.rows.iter().any(|r| r.get(field) == Some(&id)))
        });
        if referenced {
            return Err(StoreError::ForeignKeyViolation(format!("{} {} is still referenced", self.table, id)));
        }
        if let Some(t) = tables.get_mut(&self.table) {
            t.rows.retain(|r| r.get("id") != Some(&id));
        }
        Ok(())
    }
}

/// Findable only.
pub struct FindOnly<E>(pub Arc<MemoryRepository<E>>);

#[async_trait]
impl<E: Entity> Findable<E> for FindOnly<E> {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.0.find_by_id(id).await
    }

    async fn find_range(&self, offset: u64, count: Option<u64>, order: &OrderClause) -> Result<Vec<E>, StoreError> {
        self.0.find_range(offset, count, order).await
    }

    async fn count_all(&self) -> Result<u64, StoreError> {
        self.0.count_all().await
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTestEntity {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub date: Option<DateTime<FixedOffset>>,
    pub note: Option<String>,
    pub rank: i64,
    pub category: Option<i64>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl Entity for ApiTestEntity {
    const TYPE_NAME: &'static str = "fixtures::ApiTestEntity";

    fn properties() -> Vec<Property> {
        vec![
            Property::id("id", FieldType::Integer),
            Property::column("name", FieldType::String),
            Property::column("date", FieldType::DateTime).nullable(),
            // nullable with a default: required on create
            Property::column("note", FieldType::String).nullable().default_value("n/a"),
            Property::column("rank", FieldType::Integer).default_value(5),
            Property::column("category", FieldType::Integer).nullable(),
            Property::column("secret", FieldType::String).nullable().ignore(),
        ]
    }

    fn setters() -> SetterTable<Self> {
        SetterTable::new()
            .field("name", |e: &mut ApiTestEntity, v| {
                e.name = v.into_typed()?;
                Ok(())
            })
            .field("date", |e: &mut ApiTestEntity, v| {
                e.date = v.into_typed()?;
                Ok(())
            })
            .field("note", |e: &mut ApiTestEntity, v| {
                e.note = v.into_typed()?;
                Ok(())
            })
            .field("rank", |e: &mut ApiTestEntity, v| {
                e.rank = v.into_typed()?;
                Ok(())
            })
            .field("category", |e: &mut ApiTestEntity, v| {
                e.category = v.into_typed()?;
                Ok(())
            })
            .field("secret", |e: &mut ApiTestEntity, v| {
                e.secret = v.into_typed()?;
                Ok(())
            })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: i64,
    pub label: Option<String>,
}

impl Entity for Category {
    const TYPE_NAME: &'static str = "fixtures::Category";

    fn properties() -> Vec<Property> {
        vec![
            Property::id("id", FieldType::Integer),
            Property::column("label", FieldType::String).nullable(),
        ]
    }

    fn setters() -> SetterTable<Self> {
        SetterTable::new().field("label", |c: &mut Category, v| {
            c.label = v.into_typed()?;
            Ok(())
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JustFindable {
    #[serde(default)]
    pub id: i64,
    pub label: String,
}

impl Entity for JustFindable {
    const TYPE_NAME: &'static str = "fixtures::JustFindable";

    fn properties() -> Vec<Property> {
        vec![
            Property::id("id", FieldType::Integer),
            Property::column("label", FieldType::String),
        ]
    }

    fn setters() -> SetterTable<Self> {
        SetterTable::new().field("label", |j: &mut JustFindable, v| {
            j.label = v.into_typed()?;
            Ok(())
        })
    }
}

pub const API_TEST_ENTITY_MANIFEST: &str = r#"{
    "entity": "fixtures::ApiTestEntity",
    "routes": [
        {"capability": "findable"},
        {"capability": "creatable"},
        {"capability": "updatable"},
        {"capability": "deletable"}
    ]
}"#;

pub const CATEGORY_MANIFEST: &str = r#"{
    "entity": "fixtures::Category",
    "routes": [
        {"capability": "findable", "path": "/categories"},
        {"capability": "creatable", "path": "/categories"},
        {"capability": "deletable", "path": "/categories"}
    ]
}"#;

pub const JUST_FINDABLE_MANIFEST: &str = r#"{
    "entity": "fixtures::JustFindable",
    "routes": [
        {"capability": "findable"},
        {"capability": "updatable"},
        {"capability": "deletable"}
    ]
}"#;

pub fn write_manifest(dir: &Path, file: &str, contents: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

pub struct Fixture {
    pub db: Arc<MemoryDb>,
    pub entities: EntityRegistry,
    pub middleware: MiddlewareRegistry,
    pub dir: TempDir,
}

impl Fixture {
    /// Registry with the three fixture entities and their manifests on disk.
    pub fn new() -> Self {
        let db = MemoryDb::new();
        db.define("api_test_entity", &["name"], &["name", "note"], &[("category", "category")]);
        db.define("category", &[], &[], &[]);
        let tests = MemoryRepository::<ApiTestEntity>::new(&db, "api_test_entity");
        let categories = MemoryRepository::<Category>::new(&db, "category");
        let just = MemoryRepository::<JustFindable>::new(&db, "just_findable");
        let entities = EntityRegistry::new()
            .register(EntityBinding::<ApiTestEntity>::new().repository(tests))
            .register(
                EntityBinding::<Category>::new()
                    .findable(categories.clone())
                    .creatable(categories.clone())
                    .deletable(categories),
            )
            .register(EntityBinding::<JustFindable>::new().findable(Arc::new(FindOnly(just))));

        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "api_test_entity.json", API_TEST_ENTITY_MANIFEST);
        write_manifest(dir.path(), "nested/category.json", CATEGORY_MANIFEST);
        write_manifest(dir.path(), "just_findable.json", JUST_FINDABLE_MANIFEST);
        Fixture {
            db,
            entities,
            middleware: MiddlewareRegistry::with_builtins(),
            dir,
        }
    }

    pub fn table(&self) -> RoutingTable {
        RouteSynthesizer::new(self.dir.path(), &self.entities, &self.middleware)
            .synthesize()
            .unwrap()
    }

    pub fn router(&self) -> Router {
        self.router_with(Arc::new(StatusErrorHandler))
    }

    pub fn router_with(&self, errors: Arc<dyn ErrorHandler>) -> Router {
        let state = AppState::new(self.entities.clone(), self.middleware.clone(), errors);
        entity_routes(&self.table(), state).unwrap()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    send_with(router, method, uri, body, &[]).await
}

pub async fn send_with(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    let request = match body {
        Some(b) => {
            let raw = b.to_string();
            builder
                .header(CONTENT_TYPE, "application/json")
                .header(CONTENT_LENGTH, raw.len())
                .body(Body::from(raw))
                .unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse { status, headers, body }
}

/// Create a row through the API and return its assigned id.
pub async fn create(router: &Router, uri: &str, body: Value) -> i64 {
    let r = send(router, Method::POST, uri, Some(body)).await;
    assert_eq!(r.status, StatusCode::CREATED, "{}", r.body);
    r.body["id"].as_i64().unwrap()
}
