//! Route synthesis, caching and router assembly.

pub mod cache;
pub mod entity;
pub mod synthesizer;
pub mod table;

pub use cache::RouteCache;
pub use entity::{axum_path, entity_app, entity_routes};
pub use synthesizer::{handlers_for, RouteSynthesizer};
pub use table::{HandlerRef, HttpMethod, RouteBinding, RoutingTable};
