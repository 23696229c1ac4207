//! Resolved entity descriptors: manifest declarations joined with the entity's static properties.

use crate::capability::Capability;
use crate::case::api_path_segment;
use crate::entity::{FieldType, Property};
use crate::middleware::MiddlewareSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One API-exposed, persisted property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDescriptor {
    /// Field definitions for create/update, in declaration order.
    /// Skips properties that are not persisted, ignored, or autogenerated.
    pub fn from_properties(properties: &[Property]) -> Vec<FieldDescriptor> {
        properties
            .iter()
            .filter(|p| !p.ignore && !p.is_autogenerated())
            .filter_map(|p| {
                let column = p.column.as_ref()?;
                Some(FieldDescriptor {
                    name: p.exposed_name(),
                    field_type: p.field_type,
                    // Required means "has a default and the storage type is nullable".
                    required: column.default.is_some() && p.nullable,
                    default: column.default.clone(),
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRoute {
    pub capability: Capability,
    pub path: Option<String>,
    pub middleware: Vec<MiddlewareSpec>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityDescriptor {
    pub type_name: String,
    pub api_path_segment: String,
    /// Declared capabilities in manifest order.
    pub capabilities: Vec<CapabilityRoute>,
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    pub fn new(type_name: &str, properties: &[Property], capabilities: Vec<CapabilityRoute>) -> Self {
        EntityDescriptor {
            type_name: type_name.to_string(),
            api_path_segment: api_path_segment(type_name),
            capabilities,
            fields: FieldDescriptor::from_properties(properties),
        }
    }

    /// Explicit override, else `/api/{segment}`.
    pub fn base_path(&self, route: &CapabilityRoute) -> String {
        route
            .path
            .clone()
            .unwrap_or_else(|| format!("/api/{}", self.api_path_segment))
    }

    pub fn declares(&self, capability: Capability) -> bool {
        self.capabilities.iter().any(|c| c.capability == capability)
    }
}
