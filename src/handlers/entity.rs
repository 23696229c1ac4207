//! Entity CRUD handlers: get all, get by id, create, update, delete.
//! Every failure is rendered through the injected error handler; nothing propagates past these methods.

use crate::capability::{Capability, OrderClause, SortDirection};
use crate::config::FieldDescriptor;
use crate::entity::{wire_value, Entity, Property};
use crate::error::{ApiError, InvalidDateFormat, MissingFields, WriteOp};
use crate::error_handler::{render, ErrorHandler};
use crate::extractors::ApiRequest;
use crate::handlers::binding::{bind_fields, BindFailure};
use crate::registry::EntityBinding;
use crate::response::{empty_response, json_response, ListEnvelope};
use axum::{http::StatusCode, response::Response};
use serde_json::Value;
use std::sync::Arc;

/// Paging and ordering for collection GETs.
#[derive(Clone, Debug, PartialEq)]
pub struct ListParams {
    pub offset: u64,
    pub count: Option<u64>,
    pub order: OrderClause,
}

impl ListParams {
    /// `orderBy` must name an exposed, persisted property, else ordering falls back to `id`.
    pub fn from_request(request: &ApiRequest, properties: &[Property]) -> Self {
        let offset = request.query_param("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
        let count = request.query_param("count").and_then(|v| v.parse().ok());
        let field = request
            .query_param("orderBy")
            .filter(|name| {
                properties
                    .iter()
                    .any(|p| !p.ignore && p.is_persisted() && p.exposed_name() == *name)
            })
            .unwrap_or("id")
            .to_string();
        ListParams {
            offset,
            count,
            order: OrderClause {
                field,
                direction: SortDirection::parse(request.query_param("orderDirection")),
            },
        }
    }
}

pub struct RequestHandler {
    errors: Arc<dyn ErrorHandler>,
}

impl RequestHandler {
    pub fn new(errors: Arc<dyn ErrorHandler>) -> Self {
        RequestHandler { errors }
    }

    fn respond(&self, request: &ApiRequest, result: Result<Response, ApiError>) -> Response {
        result.unwrap_or_else(|e| render(self.errors.as_ref(), request, &e))
    }

    pub async fn get_all<E: Entity>(&self, binding: &EntityBinding<E>, request: &ApiRequest) -> Response {
        let result = self.try_get_all(binding, request).await;
        self.respond(request, result)
    }

    pub async fn get_by_id<E: Entity>(&self, binding: &EntityBinding<E>, request: &ApiRequest, id: &str) -> Response {
        let result = self.try_get_by_id(binding, id).await;
        self.respond(request, result)
    }

    pub async fn create<E: Entity>(
        &self,
        binding: &EntityBinding<E>,
        request: &ApiRequest,
        fields: &[FieldDescriptor],
    ) -> Response {
        let result = self.try_create(binding, request, fields).await;
        self.respond(request, result)
    }

    pub async fn update<E: Entity>(
        &self,
        binding: &EntityBinding<E>,
        request: &ApiRequest,
        fields: &[FieldDescriptor],
        id: &str,
    ) -> Response {
        let result = self.try_update(binding, request, fields, id).await;
        self.respond(request, result)
    }

    pub async fn delete<E: Entity>(&self, binding: &EntityBinding<E>, request: &ApiRequest, id: &str) -> Response {
        let result = self.try_delete(binding, id).await;
        self.respond(request, result)
    }

    async fn try_get_all<E: Entity>(&self, binding: &EntityBinding<E>, request: &ApiRequest) -> Result<Response, ApiError> {
        let finder = binding
            .finder()
            .ok_or_else(|| ApiError::capability_missing(E::TYPE_NAME, Capability::Findable))?;
        let params = ListParams::from_request(request, binding.properties());
        tracing::debug!(entity = E::TYPE_NAME, offset = params.offset, count = ?params.count, order = %params.order, "list");
        let rows = finder
            .find_range(params.offset, params.count, &params.order)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let total = finder.count_all().await.map_err(|e| ApiError::internal(e.to_string()))?;
        let items = rows
            .iter()
            .map(|e| to_wire(e, binding.properties()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json_response(StatusCode::OK, ListEnvelope::new(params.offset, items, total)))
    }

    async fn try_get_by_id<E: Entity>(&self, binding: &EntityBinding<E>, id: &str) -> Result<Response, ApiError> {
        let finder = binding
            .finder()
            .ok_or_else(|| ApiError::capability_missing(E::TYPE_NAME, Capability::Findable))?;
        let entity = finder
            .find_by_id(id)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::not_found("Entity not found"))?;
        Ok(json_response(StatusCode::OK, to_wire(&entity, binding.properties())?))
    }

    async fn try_delete<E: Entity>(&self, binding: &EntityBinding<E>, id: &str) -> Result<Response, ApiError> {
        let finder = binding
            .finder()
            .ok_or_else(|| ApiError::capability_missing(E::TYPE_NAME, Capability::Findable))?;
        let deleter = binding
            .deleter()
            .ok_or_else(|| ApiError::capability_missing(E::TYPE_NAME, Capability::Deletable))?;
        let entity = finder
            .find_by_id(id)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::not_found("The entity was not found"))?;
        deleter
            .delete(&entity)
            .await
            .map_err(|e| ApiError::from_delete(e, snapshot(&entity, binding.properties())))?;
        Ok(empty_response(StatusCode::NO_CONTENT))
    }

    async fn try_create<E: Entity>(
        &self,
        binding: &EntityBinding<E>,
        request: &ApiRequest,
        fields: &[FieldDescriptor],
    ) -> Result<Response, ApiError> {
        let creator = binding
            .creator()
            .ok_or_else(|| ApiError::capability_missing(E::TYPE_NAME, Capability::Creatable))?;
        let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name.as_str()).collect();
        let body = match request.body.as_ref() {
            Some(Value::Object(map)) => map,
            _ => {
                return Err(ApiError::MissingFields(MissingFields {
                    fields: required.iter().map(|s| s.to_string()).collect(),
                }))
            }
        };
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !body.contains_key(**name))
            .map(|s| s.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::MissingFields(MissingFields { fields: missing }));
        }

        let mut entity = E::default();
        bind_fields(binding.setters(), fields, Some(body), WriteOp::Create, &mut entity)
            .map_err(|f| bind_error(f, WriteOp::Create, snapshot(&entity, binding.properties())))?;
        creator
            .create(&mut entity)
            .await
            .map_err(|e| ApiError::from_write(WriteOp::Create, e, snapshot(&entity, binding.properties())))?;
        tracing::debug!(entity = E::TYPE_NAME, "created");
        Ok(json_response(StatusCode::CREATED, to_wire(&entity, binding.properties())?))
    }

    async fn try_update<E: Entity>(
        &self,
        binding: &EntityBinding<E>,
        request: &ApiRequest,
        fields: &[FieldDescriptor],
        id: &str,
    ) -> Result<Response, ApiError> {
        let finder = binding
            .finder()
            .ok_or_else(|| ApiError::capability_missing(E::TYPE_NAME, Capability::Findable))?;
        let updater = binding
            .updater()
            .ok_or_else(|| ApiError::capability_missing(E::TYPE_NAME, Capability::Updatable))?;
        let mut entity = finder
            .find_by_id(id)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?
            .ok_or_else(|| ApiError::not_found("Entity not found"))?;
        let body = request.body.as_ref().and_then(Value::as_object);
        bind_fields(binding.setters(), fields, body, WriteOp::Update, &mut entity)
            .map_err(|f| bind_error(f, WriteOp::Update, snapshot(&entity, binding.properties())))?;
        updater
            .update(&mut entity)
            .await
            .map_err(|e| ApiError::from_write(WriteOp::Update, e, snapshot(&entity, binding.properties())))?;
        Ok(empty_response(StatusCode::NO_CONTENT))
    }
}

fn to_wire<E: Entity>(entity: &E, properties: &[Property]) -> Result<Value, ApiError> {
    wire_value(entity, properties).map_err(|e| ApiError::internal(format!("serialize entity: {}", e)))
}

fn snapshot<E: Entity>(entity: &E, properties: &[Property]) -> Option<Value> {
    wire_value(entity, properties).ok()
}

fn bind_error(failure: BindFailure, op: WriteOp, entity: Option<Value>) -> ApiError {
    match failure {
        BindFailure::InvalidDate { field, date } => ApiError::InvalidDateFormat(InvalidDateFormat { field, date }),
        BindFailure::NullNotAllowed { field } => {
            let message = format!("{} must not be null", field);
            ApiError::column_is_null(op, Some(field), message, entity)
        }
        BindFailure::Mismatch { field, message } => ApiError::internal(format!("bind {}: {}", field, message)),
    }
}
