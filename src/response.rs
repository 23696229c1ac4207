//! Response body helpers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Body of a collection GET.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEnvelope<T> {
    pub offset: u64,
    pub items_count: u64,
    pub total_count: u64,
    pub items: Vec<T>,
}

impl<T> ListEnvelope<T> {
    pub fn new(offset: u64, items: Vec<T>, total_count: u64) -> Self {
        ListEnvelope {
            offset,
            items_count: items.len() as u64,
            total_count,
            items,
        }
    }
}

pub fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
}

pub fn empty_response(status: StatusCode) -> Response {
    status.into_response()
}

pub fn error_body(code: &str, message: String, details: Option<Value>) -> Value {
    serde_json::json!({
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}
