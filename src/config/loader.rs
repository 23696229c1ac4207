//! Load entity manifests from disk and resolve them into entity descriptors.

use crate::config::resolved::{CapabilityRoute, EntityDescriptor};
use crate::config::types::EntityManifest;
use crate::config::validate_manifest;
use crate::entity::Property;
use crate::error::ConfigError;
use crate::middleware::MiddlewareRegistry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// All regular files under `dir`, recursively, in file-name order per directory.
/// Entries that cannot be read (permissions, symlink loops, dangling links) are logged and skipped;
/// only a missing root is an error.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if !dir.is_dir() {
        return Err(io::Error::new(io::ErrorKind::NotFound, format!("{} is not a directory", dir.display())).into());
    }
    let files = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    Ok(files)
}

/// Candidate manifest files (`*.json`) under `dir`.
pub fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    Ok(walk_files(dir)?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect())
}

/// Read, parse and validate one manifest.
pub fn load_manifest(path: &Path) -> Result<EntityManifest, ConfigError> {
    let manifest_error = |message: String| ConfigError::Manifest {
        path: path.display().to_string(),
        message,
    };
    let raw = fs::read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
    let manifest: EntityManifest = serde_json::from_str(&raw).map_err(|e| manifest_error(e.to_string()))?;
    validate_manifest(&manifest).map_err(|e| manifest_error(e.to_string()))?;
    Ok(manifest)
}

/// Join a manifest with the entity's properties. Middleware is materialised against `middleware`;
/// unknown middleware names are dropped.
pub fn resolve(
    manifest: &EntityManifest,
    properties: &[Property],
    middleware: &MiddlewareRegistry,
) -> EntityDescriptor {
    let capabilities = manifest
        .routes
        .iter()
        .map(|route| CapabilityRoute {
            capability: route.capability,
            path: route.path.clone(),
            middleware: route
                .middleware
                .iter()
                .filter_map(|m| middleware.materialize(m))
                .collect(),
        })
        .collect();
    EntityDescriptor::new(&manifest.entity, properties, capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::config::{MiddlewareDeclaration, RouteDeclaration};
    use crate::entity::FieldType;

    #[test]
    fn manifest_files_are_recursive_and_json_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("nested/a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let files = manifest_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, ["b.json", "nested/a.json"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk_files(&dir.path().join("absent")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entries_do_not_abort_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.json"), dir.path().join("dangling.json")).unwrap();
        let files = manifest_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.json")]);
    }

    #[test]
    fn malformed_manifest_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"), "{err}");
    }

    #[test]
    fn resolve_materialises_middleware() {
        let manifest = EntityManifest::new("Widget").route(
            RouteDeclaration::new(Capability::Findable)
                .middleware(MiddlewareDeclaration::new("require-header").arg("header", "x-key"))
                .middleware(MiddlewareDeclaration::new("unknown")),
        );
        let d = resolve(
            &manifest,
            &[Property::column("name", FieldType::String)],
            &MiddlewareRegistry::with_builtins(),
        );
        assert_eq!(d.api_path_segment, "widget");
        assert_eq!(d.capabilities[0].middleware.len(), 1);
        assert_eq!(d.capabilities[0].middleware[0].args, vec![serde_json::Value::from("x-key")]);
    }
}
