//! Extract the originating request: method, uri, headers, query params and the parsed JSON body.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Query, Request},
    http::{header::CONTENT_TYPE, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::HashMap;

/// Request as seen by entity handlers and error overrides.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    /// Parsed only for `application/json` requests; `None` when absent or undecodable.
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        let query = Query::<HashMap<String, String>>::try_from_uri(&uri)
            .map(|q| q.0)
            .unwrap_or_default();
        ApiRequest {
            method,
            uri,
            headers: HeaderMap::new(),
            query,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for ApiRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    /// The body is buffered through `Bytes`, so `DefaultBodyLimit` (2 MiB unless layered otherwise) applies.
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut request = ApiRequest::new(req.method().clone(), req.uri().clone());
        request.headers = req.headers().clone();
        let bytes = Bytes::from_request(req, state).await.map_err(IntoResponse::into_response)?;
        if is_json(&request.headers) && !bytes.is_empty() {
            request.body = serde_json::from_slice::<Value>(&bytes).ok().filter(|v| !v.is_null());
        }
        Ok(request)
    }
}
