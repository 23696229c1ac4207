//! Routing table: the serialisable output of route synthesis.

use crate::config::FieldDescriptor;
use crate::error::ConfigError;
use crate::middleware::MiddlewareSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Request handler operation a binding dispatches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerRef {
    GetAll,
    GetById,
    Create,
    Update,
    Delete,
}

impl HandlerRef {
    pub fn method(&self) -> HttpMethod {
        match self {
            HandlerRef::GetAll | HandlerRef::GetById => HttpMethod::Get,
            HandlerRef::Create => HttpMethod::Post,
            HandlerRef::Update => HttpMethod::Put,
            HandlerRef::Delete => HttpMethod::Delete,
        }
    }

    /// Whether the path ends in the `{id}` parameter.
    pub fn takes_id(&self) -> bool {
        matches!(self, HandlerRef::GetById | HandlerRef::Update | HandlerRef::Delete)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteBinding {
    pub method: HttpMethod,
    /// Static prefix, optionally followed by `/{id}`.
    pub path: String,
    pub handler: HandlerRef,
    /// Registered entity type name.
    pub entity: String,
    /// Field definitions the create/update handlers bind from.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub middleware: Vec<MiddlewareSpec>,
}

impl RouteBinding {
    pub fn new(handler: HandlerRef, base: &str, entity: &str) -> Self {
        let path = if handler.takes_id() {
            format!("{}/{{id}}", base)
        } else {
            base.to_string()
        };
        RouteBinding {
            method: handler.method(),
            path,
            handler,
            entity: entity.to_string(),
            fields: Vec::new(),
            middleware: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub routes: Vec<RouteBinding>,
}

impl RoutingTable {
    pub fn new(routes: Vec<RouteBinding>) -> Self {
        RoutingTable { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn for_entity<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a RouteBinding> + 'a {
        self.routes.iter().filter(move |r| r.entity == type_name)
    }

    /// Each (method, path) may be bound once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert((route.method, route.path.as_str())) {
                return Err(ConfigError::DuplicateRoute {
                    method: route.method.to_string(),
                    path: route.path.clone(),
                });
            }
        }
        Ok(())
    }
}
