//! Shared state for generated entity routes. Built once at startup, read-only afterwards.

use crate::error_handler::ErrorHandler;
use crate::handlers::RequestHandler;
use crate::middleware::MiddlewareRegistry;
use crate::registry::EntityRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<RequestHandler>,
    pub entities: Arc<EntityRegistry>,
    pub middleware: Arc<MiddlewareRegistry>,
}

impl AppState {
    pub fn new(entities: EntityRegistry, middleware: MiddlewareRegistry, errors: Arc<dyn ErrorHandler>) -> Self {
        AppState {
            handler: Arc::new(RequestHandler::new(errors)),
            entities: Arc::new(entities),
            middleware: Arc::new(middleware),
        }
    }
}
