//! Override hook for rendering taxonomy errors. Returning `None` keeps the default: status code, empty body.

use crate::error::{ApiError, ColumnIsNull, ConstraintFailed, Internal, InvalidDateFormat, MissingFields, NotFound};
use crate::extractors::ApiRequest;
use crate::response::error_body;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// One method per taxonomy entry. Implementors override only what they want to render themselves.
pub trait ErrorHandler: Send + Sync {
    /// Entry point used by the request handler; dispatches to the per-entry methods.
    fn handle(&self, request: &ApiRequest, error: &ApiError) -> Option<Response> {
        match error {
            ApiError::NotFound(e) => self.not_found(request, e),
            ApiError::MissingFields(e) => self.missing_fields(request, e),
            ApiError::CreateColumnIsNull(e) => self.create_column_is_null(request, e),
            ApiError::CreateUniqueFailed(e) => self.create_unique_failed(request, e),
            ApiError::CreateReferenceFailed(e) => self.create_reference_failed(request, e),
            ApiError::UpdateColumnIsNull(e) => self.update_column_is_null(request, e),
            ApiError::UpdateUniqueFailed(e) => self.update_unique_failed(request, e),
            ApiError::UpdateReferenceFailed(e) => self.update_reference_failed(request, e),
            ApiError::DeleteReferenced(e) => self.delete_referenced(request, e),
            ApiError::InvalidDateFormat(e) => self.invalid_date_format(request, e),
            ApiError::Internal(e) => self.internal_server_error(request, e),
        }
    }

    fn not_found(&self, _request: &ApiRequest, _error: &NotFound) -> Option<Response> {
        None
    }

    fn internal_server_error(&self, _request: &ApiRequest, _error: &Internal) -> Option<Response> {
        None
    }

    fn missing_fields(&self, _request: &ApiRequest, _error: &MissingFields) -> Option<Response> {
        None
    }

    fn create_column_is_null(&self, _request: &ApiRequest, _error: &ColumnIsNull) -> Option<Response> {
        None
    }

    fn create_unique_failed(&self, _request: &ApiRequest, _error: &ConstraintFailed) -> Option<Response> {
        None
    }

    fn create_reference_failed(&self, _request: &ApiRequest, _error: &ConstraintFailed) -> Option<Response> {
        None
    }

    fn update_column_is_null(&self, _request: &ApiRequest, _error: &ColumnIsNull) -> Option<Response> {
        None
    }

    fn update_unique_failed(&self, _request: &ApiRequest, _error: &ConstraintFailed) -> Option<Response> {
        None
    }

    fn update_reference_failed(&self, _request: &ApiRequest, _error: &ConstraintFailed) -> Option<Response> {
        None
    }

    fn delete_referenced(&self, _request: &ApiRequest, _error: &ConstraintFailed) -> Option<Response> {
        None
    }

    fn invalid_date_format(&self, _request: &ApiRequest, _error: &InvalidDateFormat) -> Option<Response> {
        None
    }
}

/// Renders nothing: every error becomes its default status with an empty body.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusErrorHandler;

impl ErrorHandler for StatusErrorHandler {}

/// Renders every error as `{"error": {"code", "message", "details"}}` with the default status.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonErrorHandler;

impl ErrorHandler for JsonErrorHandler {
    fn handle(&self, _request: &ApiRequest, error: &ApiError) -> Option<Response> {
        let (message, details) = match error {
            ApiError::MissingFields(e) => (error.to_string(), Some(json!({ "fields": e.fields }))),
            ApiError::InvalidDateFormat(e) => (error.to_string(), Some(json!({ "field": e.field, "date": e.date }))),
            ApiError::CreateColumnIsNull(e) | ApiError::UpdateColumnIsNull(e) => {
                (error.to_string(), e.column.as_ref().map(|c| json!({ "column": c })))
            }
            // Store and wiring messages stay in the logs.
            ApiError::Internal(_) => ("internal server error".to_string(), None),
            _ => (error.to_string(), None),
        };
        Some((error.status(), Json(error_body(error.code(), message, details))).into_response())
    }
}

/// Render an error through the override, falling back to the bare default status.
pub fn render(handler: &dyn ErrorHandler, request: &ApiRequest, error: &ApiError) -> Response {
    if error.status().is_server_error() {
        tracing::error!(method = %request.method, uri = %request.uri, error = %error, "request failed");
    } else {
        tracing::debug!(method = %request.method, uri = %request.uri, error = %error, "request rejected");
    }
    handler
        .handle(request, error)
        .unwrap_or_else(|| error.status().into_response())
}
