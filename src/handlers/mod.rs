//! Request handling for generated entity routes.

pub mod binding;
pub mod entity;

pub use binding::{bind_fields, parse_w3c, BindFailure, W3C_FORMAT};
pub use entity::{ListParams, RequestHandler};
