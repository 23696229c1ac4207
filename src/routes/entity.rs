//! Axum router assembly for a routing table.
//! Each binding becomes one method route closed over its entity endpoint and field definitions;
//! bindings sharing a path are merged by axum.

use crate::config::FieldDescriptor;
use crate::error::ConfigError;
use crate::extractors::ApiRequest;
use crate::handlers::RequestHandler;
use crate::middleware;
use crate::registry::EntityEndpoint;
use crate::routes::table::{HandlerRef, HttpMethod, RouteBinding, RoutingTable};
use crate::state::AppState;
use axum::{
    extract::Path,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// `{id}` templates to axum 0.7 `:id` captures.
pub fn axum_path(template: &str) -> String {
    template.replace("{id}", ":id")
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

fn method_route(
    binding: &RouteBinding,
    handler: Arc<RequestHandler>,
    endpoint: Arc<dyn EntityEndpoint>,
) -> MethodRouter {
    let filter = method_filter(binding.method);
    let fields: Arc<[FieldDescriptor]> = binding.fields.clone().into();
    match binding.handler {
        HandlerRef::GetAll => on(filter, move |request: ApiRequest| async move {
            endpoint.get_all(&handler, request).await
        }),
        HandlerRef::GetById => on(filter, move |Path(id): Path<String>, request: ApiRequest| async move {
            endpoint.get_by_id(&handler, request, id).await
        }),
        HandlerRef::Create => on(filter, move |request: ApiRequest| async move {
            endpoint.create(&handler, request, &fields).await
        }),
        HandlerRef::Update => on(filter, move |Path(id): Path<String>, request: ApiRequest| async move {
            endpoint.update(&handler, request, &fields, id).await
        }),
        HandlerRef::Delete => on(filter, move |Path(id): Path<String>, request: ApiRequest| async move {
            endpoint.delete(&handler, request, id).await
        }),
    }
}

/// Build the router for every binding in `table`. Entities and middleware named by the table must
/// be registered in `state`.
pub fn entity_routes(table: &RoutingTable, state: AppState) -> Result<Router, ConfigError> {
    table.validate()?;
    let mut router = Router::new();
    for binding in &table.routes {
        let endpoint = state
            .entities
            .get(&binding.entity)
            .ok_or_else(|| ConfigError::UnknownEntity(binding.entity.clone()))?;
        let layers = binding
            .middleware
            .iter()
            .map(|spec| state.middleware.instantiate(spec))
            .collect::<Result<Vec<_>, _>>()?;
        let route = method_route(binding, Arc::clone(&state.handler), endpoint);
        router = router.route(&axum_path(&binding.path), middleware::apply(route, &layers));
        tracing::debug!(method = %binding.method, path = %binding.path, entity = %binding.entity, "route registered");
    }
    Ok(router)
}

/// [`entity_routes`] with request bodies capped at `max_body_bytes` (413 beyond).
pub fn entity_app(table: &RoutingTable, state: AppState, max_body_bytes: usize) -> Result<Router, ConfigError> {
    Ok(entity_routes(table, state)?.layer(RequestBodyLimitLayer::new(max_body_bytes)))
}
