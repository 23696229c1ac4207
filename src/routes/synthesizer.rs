//! Route synthesis: scan entity manifests, keep entities that both declare and implement a
//! capability, and emit one binding per (entity, handler).

use crate::capability::Capability;
use crate::config::{load_manifest, manifest_files, resolve, EntityDescriptor};
use crate::error::ConfigError;
use crate::middleware::MiddlewareRegistry;
use crate::registry::EntityRegistry;
use crate::routes::table::{HandlerRef, RouteBinding, RoutingTable};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Handlers bound for a declared capability.
pub fn handlers_for(capability: Capability) -> &'static [HandlerRef] {
    match capability {
        Capability::Findable => &[HandlerRef::GetAll, HandlerRef::GetById],
        Capability::Creatable => &[HandlerRef::Create],
        Capability::Updatable => &[HandlerRef::Update],
        Capability::Deletable => &[HandlerRef::Delete],
    }
}

/// Not shareable across threads while scanning; discovered entities are memoised per instance.
pub struct RouteSynthesizer<'a> {
    entity_dir: PathBuf,
    entities: &'a EntityRegistry,
    middleware: &'a MiddlewareRegistry,
    discovered: Option<Vec<EntityDescriptor>>,
}

impl<'a> RouteSynthesizer<'a> {
    pub fn new(entity_dir: impl Into<PathBuf>, entities: &'a EntityRegistry, middleware: &'a MiddlewareRegistry) -> Self {
        RouteSynthesizer {
            entity_dir: entity_dir.into(),
            entities,
            middleware,
            discovered: None,
        }
    }

    pub fn entity_dir(&self) -> &Path {
        &self.entity_dir
    }

    /// Entities eligible for routing, scanned on first call only.
    pub fn entities(&mut self) -> Result<&[EntityDescriptor], ConfigError> {
        if self.discovered.is_none() {
            self.discovered = Some(self.discover()?);
        }
        Ok(self.discovered.as_deref().unwrap_or_default())
    }

    pub fn synthesize(&mut self) -> Result<RoutingTable, ConfigError> {
        let mut routes = Vec::new();
        for entity in self.entities()? {
            let mut declared: Vec<_> = entity.capabilities.iter().collect();
            declared.sort_by_key(|c| c.capability);
            for route in declared {
                let base = entity.base_path(route);
                for handler in handlers_for(route.capability) {
                    let mut binding = RouteBinding::new(*handler, &base, &entity.type_name);
                    if matches!(handler, HandlerRef::Create | HandlerRef::Update) {
                        binding.fields = entity.fields.clone();
                    }
                    binding.middleware = route.middleware.clone();
                    routes.push(binding);
                }
            }
        }
        let table = RoutingTable::new(routes);
        table.validate()?;
        tracing::info!(dir = %self.entity_dir.display(), routes = table.len(), "synthesized entity routes");
        Ok(table)
    }

    fn discover(&self) -> Result<Vec<EntityDescriptor>, ConfigError> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for path in manifest_files(&self.entity_dir)? {
            let manifest = match load_manifest(&path) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping entity manifest");
                    continue;
                }
            };
            let Some(endpoint) = self.entities.get(&manifest.entity) else {
                tracing::warn!(path = %path.display(), entity = %manifest.entity, "entity type not registered, skipping");
                continue;
            };
            if manifest.routes.is_empty() {
                tracing::debug!(entity = %manifest.entity, "no capabilities declared");
                continue;
            }
            if !manifest.routes.iter().any(|r| endpoint.implements(r.capability)) {
                tracing::warn!(entity = %manifest.entity, "declared capabilities are not implemented, skipping");
                continue;
            }
            if !seen.insert(manifest.entity.clone()) {
                tracing::warn!(path = %path.display(), entity = %manifest.entity, "entity declared twice, keeping first manifest");
                continue;
            }
            for route in manifest.routes.iter().filter(|r| !endpoint.implements(r.capability)) {
                tracing::warn!(entity = %manifest.entity, capability = %route.capability, "declared capability has no implementation");
            }
            out.push(resolve(&manifest, endpoint.properties(), self.middleware));
        }
        Ok(out)
    }
}
