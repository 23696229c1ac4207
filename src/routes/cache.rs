//! On-disk routing table cache, invalidated by entity manifest modification times.

use crate::config::walk_files;
use crate::error::ConfigError;
use crate::routes::synthesizer::RouteSynthesizer;
use crate::routes::table::RoutingTable;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const CACHE_SUBDIR: &str = "entity-api";
const CACHE_FILE: &str = "routes.json";

pub struct RouteCache {
    file: PathBuf,
}

impl RouteCache {
    /// Artifact lives at `<cache_dir>/entity-api/routes.json`; a `cache_dir` that is not an
    /// existing directory is replaced by `<cwd>/var/cache`.
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        let cache_dir = cache_dir.as_ref();
        let root = if cache_dir.is_dir() {
            cache_dir.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("var")
                .join("cache")
        };
        RouteCache {
            file: root.join(CACHE_SUBDIR).join(CACHE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Missing artifact, or any file under `entity_dir` modified after it.
    pub fn is_stale(&self, entity_dir: &Path) -> bool {
        let Some(cached_at) = modified(&self.file) else {
            return true;
        };
        match walk_files(entity_dir) {
            Ok(files) => files.iter().filter_map(|f| modified(f)).any(|m| m > cached_at),
            Err(e) => {
                tracing::warn!(dir = %entity_dir.display(), error = %e, "cannot scan entity dir, treating cache as stale");
                true
            }
        }
    }

    pub fn load(&self) -> Result<RoutingTable, ConfigError> {
        let raw = fs::read_to_string(&self.file)?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Cache(format!("{}: {}", self.file.display(), e)))
    }

    pub fn store(&self, table: &RoutingTable) -> Result<(), ConfigError> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(table).map_err(|e| ConfigError::Cache(e.to_string()))?;
        fs::write(&self.file, raw)?;
        Ok(())
    }

    /// Cached table when fresh; otherwise synthesize and rewrite the artifact.
    pub fn load_or_build(&self, entity_dir: &Path, synthesizer: &mut RouteSynthesizer<'_>) -> Result<RoutingTable, ConfigError> {
        if !self.is_stale(entity_dir) {
            match self.load() {
                Ok(table) => {
                    tracing::info!(path = %self.file.display(), routes = table.len(), "using cached entity routes");
                    return Ok(table);
                }
                Err(e) => tracing::warn!(error = %e, "unreadable route cache, regenerating"),
            }
        }
        let table = synthesizer.synthesize()?;
        self.store(&table)?;
        tracing::info!(path = %self.file.display(), "wrote route cache");
        Ok(table)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
