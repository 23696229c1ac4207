//! Entity API SDK: REST CRUD routes synthesized from entity manifests and registered capability
//! implementations.

pub mod capability;
pub mod case;
pub mod config;
pub mod entity;
pub mod error;
pub mod error_handler;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod response;
pub mod routes;
pub mod sql;
pub mod state;
pub mod store;

pub use capability::{Capability, Creatable, Deletable, Findable, OrderClause, SortDirection, StoreError, Updatable};
pub use config::{EntityDescriptor, EntityManifest, FieldDescriptor, Settings};
pub use entity::{BindError, Entity, FieldType, FieldValue, Property, SetterTable};
pub use error::{ApiError, ConfigError};
pub use error_handler::{ErrorHandler, JsonErrorHandler, StatusErrorHandler};
pub use extractors::ApiRequest;
pub use handlers::RequestHandler;
pub use middleware::{MiddlewareFactory, MiddlewareRegistry, RouteMiddleware};
pub use registry::{EntityBinding, EntityEndpoint, EntityRegistry};
pub use response::{error_body, ListEnvelope};
pub use routes::{entity_app, entity_routes, RouteBinding, RouteCache, RouteSynthesizer, RoutingTable};
pub use state::AppState;
pub use store::PgRepository;
