//! Per-route middleware. Manifests declare middleware by factory name with named arguments; the
//! synthesizer materialises them into [`MiddlewareSpec`]s (arguments in the factory's parameter
//! order) so a cached routing table can rebuild the same instances without rerunning discovery.

use crate::config::MiddlewareDeclaration;
use crate::error::ConfigError;
use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait RouteMiddleware: Send + Sync {
    async fn handle(&self, request: Request, next: Next) -> Response;
}

/// Materialised middleware instantiation: factory name and positional constructor arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareSpec {
    pub name: String,
    pub args: Vec<Value>,
}

pub type BuildFn = fn(&[Value]) -> Result<Arc<dyn RouteMiddleware>, String>;

#[derive(Clone)]
pub struct MiddlewareFactory {
    pub name: String,
    /// Constructor parameter names, in order.
    pub params: Vec<String>,
    pub build: BuildFn,
}

impl MiddlewareFactory {
    pub fn new(name: impl Into<String>, params: &[&str], build: BuildFn) -> Self {
        MiddlewareFactory {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            build,
        }
    }
}

#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, MiddlewareFactory>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `require-header` and `response-header`.
    pub fn with_builtins() -> Self {
        Self::new()
            .register(MiddlewareFactory::new("require-header", &["header"], RequireHeader::build))
            .register(MiddlewareFactory::new("response-header", &["name", "value"], ResponseHeader::build))
    }

    pub fn register(mut self, factory: MiddlewareFactory) -> Self {
        self.factories.insert(factory.name.clone(), factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MiddlewareFactory> {
        self.factories.get(name)
    }

    /// Order declared arguments by the factory's parameters. Unknown factories yield `None`;
    /// parameters without a declared argument are skipped.
    pub fn materialize(&self, declaration: &MiddlewareDeclaration) -> Option<MiddlewareSpec> {
        let Some(factory) = self.get(&declaration.name) else {
            tracing::warn!(middleware = %declaration.name, "unknown middleware, skipping");
            return None;
        };
        let args = factory
            .params
            .iter()
            .filter_map(|p| declaration.args.get(p).cloned())
            .collect();
        Some(MiddlewareSpec {
            name: factory.name.clone(),
            args,
        })
    }

    pub fn instantiate(&self, spec: &MiddlewareSpec) -> Result<Arc<dyn RouteMiddleware>, ConfigError> {
        let factory = self
            .get(&spec.name)
            .ok_or_else(|| ConfigError::UnknownMiddleware(spec.name.clone()))?;
        (factory.build)(&spec.args).map_err(|message| ConfigError::Middleware {
            name: spec.name.clone(),
            message,
        })
    }
}

/// Layer middleware onto a route; the first in the list runs outermost.
pub fn apply<S>(mut route: MethodRouter<S>, middleware: &[Arc<dyn RouteMiddleware>]) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    for mw in middleware.iter().rev() {
        let mw = Arc::clone(mw);
        route = route.layer(from_fn(move |request: Request, next: Next| {
            let mw = Arc::clone(&mw);
            async move { mw.handle(request, next).await }
        }));
    }
    route
}

fn string_arg(args: &[Value], index: usize, param: &str) -> Result<String, String> {
    args.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("missing string argument '{}'", param))
}

/// Rejects requests lacking a header with 401.
pub struct RequireHeader {
    header: HeaderName,
}

impl RequireHeader {
    pub fn new(header: &str) -> Result<Self, String> {
        let header = HeaderName::try_from(header).map_err(|e| e.to_string())?;
        Ok(RequireHeader { header })
    }

    fn build(args: &[Value]) -> Result<Arc<dyn RouteMiddleware>, String> {
        Ok(Arc::new(Self::new(&string_arg(args, 0, "header")?)?))
    }
}

#[async_trait]
impl RouteMiddleware for RequireHeader {
    async fn handle(&self, request: Request, next: Next) -> Response {
        if !request.headers().contains_key(&self.header) {
            tracing::debug!(header = %self.header, "required header missing");
            return StatusCode::UNAUTHORIZED.into_response();
        }
        next.run(request).await
    }
}

/// Adds a fixed header to every response.
pub struct ResponseHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl ResponseHeader {
    pub fn new(name: &str, value: &str) -> Result<Self, String> {
        Ok(ResponseHeader {
            name: HeaderName::try_from(name).map_err(|e| e.to_string())?,
            value: HeaderValue::try_from(value).map_err(|e| e.to_string())?,
        })
    }

    fn build(args: &[Value]) -> Result<Arc<dyn RouteMiddleware>, String> {
        Ok(Arc::new(Self::new(
            &string_arg(args, 0, "name")?,
            &string_arg(args, 1, "value")?,
        )?))
    }
}

#[async_trait]
impl RouteMiddleware for ResponseHeader {
    async fn handle(&self, request: Request, next: Next) -> Response {
        let mut response = next.run(request).await;
        response.headers_mut().insert(self.name.clone(), self.value.clone());
        response
    }
}
