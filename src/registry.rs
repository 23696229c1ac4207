//! Registered entity types and the capability implementations bound to them.

use crate::capability::{Capability, Creatable, Deletable, Findable, Updatable};
use crate::config::FieldDescriptor;
use crate::entity::{Entity, Property, SetterTable};
use crate::extractors::ApiRequest;
use crate::handlers::RequestHandler;
use async_trait::async_trait;
use axum::response::Response;
use std::collections::HashMap;
use std::sync::Arc;

/// An entity type with whichever capability contracts its persistence collaborator implements.
pub struct EntityBinding<E: Entity> {
    properties: Vec<Property>,
    setters: SetterTable<E>,
    finder: Option<Arc<dyn Findable<E>>>,
    creator: Option<Arc<dyn Creatable<E>>>,
    updater: Option<Arc<dyn Updatable<E>>>,
    deleter: Option<Arc<dyn Deletable<E>>>,
}

impl<E: Entity> Default for EntityBinding<E> {
    fn default() -> Self {
        EntityBinding {
            properties: E::properties(),
            setters: E::setters(),
            finder: None,
            creator: None,
            updater: None,
            deleter: None,
        }
    }
}

impl<E: Entity> EntityBinding<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findable(mut self, finder: Arc<dyn Findable<E>>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn creatable(mut self, creator: Arc<dyn Creatable<E>>) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn updatable(mut self, updater: Arc<dyn Updatable<E>>) -> Self {
        self.updater = Some(updater);
        self
    }

    pub fn deletable(mut self, deleter: Arc<dyn Deletable<E>>) -> Self {
        self.deleter = Some(deleter);
        self
    }

    /// Bind one repository for all four capabilities.
    pub fn repository<R>(self, repository: Arc<R>) -> Self
    where
        R: Findable<E> + Creatable<E> + Updatable<E> + Deletable<E> + 'static,
    {
        self.findable(repository.clone())
            .creatable(repository.clone())
            .updatable(repository.clone())
            .deletable(repository)
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn setters(&self) -> &SetterTable<E> {
        &self.setters
    }

    pub fn finder(&self) -> Option<&dyn Findable<E>> {
        self.finder.as_deref()
    }

    pub fn creator(&self) -> Option<&dyn Creatable<E>> {
        self.creator.as_deref()
    }

    pub fn updater(&self) -> Option<&dyn Updatable<E>> {
        self.updater.as_deref()
    }

    pub fn deleter(&self) -> Option<&dyn Deletable<E>> {
        self.deleter.as_deref()
    }

    pub fn implements(&self, capability: Capability) -> bool {
        match capability {
            Capability::Findable => self.finder.is_some(),
            Capability::Creatable => self.creator.is_some(),
            Capability::Updatable => self.updater.is_some(),
            Capability::Deletable => self.deleter.is_some(),
        }
    }
}

/// Type-erased view of an [`EntityBinding`], used by generated routes.
#[async_trait]
pub trait EntityEndpoint: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn properties(&self) -> &[Property];
    fn implements(&self, capability: Capability) -> bool;

    async fn get_all(&self, handler: &RequestHandler, request: ApiRequest) -> Response;
    async fn get_by_id(&self, handler: &RequestHandler, request: ApiRequest, id: String) -> Response;
    async fn create(&self, handler: &RequestHandler, request: ApiRequest, fields: &[FieldDescriptor]) -> Response;
    async fn update(
        &self,
        handler: &RequestHandler,
        request: ApiRequest,
        fields: &[FieldDescriptor],
        id: String,
    ) -> Response;
    async fn delete(&self, handler: &RequestHandler, request: ApiRequest, id: String) -> Response;
}

#[async_trait]
impl<E: Entity> EntityEndpoint for EntityBinding<E> {
    fn type_name(&self) -> &'static str {
        E::TYPE_NAME
    }

    fn properties(&self) -> &[Property] {
        &self.properties
    }

    fn implements(&self, capability: Capability) -> bool {
        EntityBinding::implements(self, capability)
    }

    async fn get_all(&self, handler: &RequestHandler, request: ApiRequest) -> Response {
        handler.get_all(self, &request).await
    }

    async fn get_by_id(&self, handler: &RequestHandler, request: ApiRequest, id: String) -> Response {
        handler.get_by_id(self, &request, &id).await
    }

    async fn create(&self, handler: &RequestHandler, request: ApiRequest, fields: &[FieldDescriptor]) -> Response {
        handler.create(self, &request, fields).await
    }

    async fn update(
        &self,
        handler: &RequestHandler,
        request: ApiRequest,
        fields: &[FieldDescriptor],
        id: String,
    ) -> Response {
        handler.update(self, &request, fields, &id).await
    }

    async fn delete(&self, handler: &RequestHandler, request: ApiRequest, id: String) -> Response {
        handler.delete(self, &request, &id).await
    }
}

/// Entity types known to the process, by `TYPE_NAME`.
#[derive(Clone, Default)]
pub struct EntityRegistry {
    entities: HashMap<String, Arc<dyn EntityEndpoint>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Entity>(mut self, binding: EntityBinding<E>) -> Self {
        self.entities.insert(E::TYPE_NAME.to_string(), Arc::new(binding));
        self
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn EntityEndpoint>> {
        self.entities.get(type_name).cloned()
    }
}
