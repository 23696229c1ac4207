//! Raw entity manifest types: one JSON document per entity declaring its routes.

use crate::capability::Capability;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declares which capabilities of a registered entity type are exposed, and how.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityManifest {
    /// Registered `Entity::TYPE_NAME`.
    pub entity: String,
    #[serde(default)]
    pub routes: Vec<RouteDeclaration>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteDeclaration {
    pub capability: Capability,
    /// Overrides the default `/api/{segment}` base path.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub middleware: Vec<MiddlewareDeclaration>,
}

/// A middleware instance as declared: factory name plus named constructor arguments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MiddlewareDeclaration {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl EntityManifest {
    pub fn new(entity: impl Into<String>) -> Self {
        EntityManifest {
            entity: entity.into(),
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, route: RouteDeclaration) -> Self {
        self.routes.push(route);
        self
    }
}

impl RouteDeclaration {
    pub fn new(capability: Capability) -> Self {
        RouteDeclaration {
            capability,
            path: None,
            middleware: Vec::new(),
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn middleware(mut self, middleware: MiddlewareDeclaration) -> Self {
        self.middleware.push(middleware);
        self
    }
}

impl MiddlewareDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        MiddlewareDeclaration {
            name: name.into(),
            args: Map::new(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}
