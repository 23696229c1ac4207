//! Manifest validation: one declaration per capability, well-formed path overrides.

use crate::config::EntityManifest;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

const PATH_PATTERN: &str = r"^(/[A-Za-z0-9._~-]+)+$";

pub fn validate_manifest(manifest: &EntityManifest) -> Result<(), ConfigError> {
    if manifest.entity.trim().is_empty() {
        return Err(ConfigError::Validation("entity type name is empty".into()));
    }
    let path_re = Regex::new(PATH_PATTERN).map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut seen = HashSet::new();
    for route in &manifest.routes {
        if !seen.insert(route.capability) {
            return Err(ConfigError::Validation(format!(
                "{} declared more than once for {}",
                route.capability, manifest.entity
            )));
        }
        if let Some(path) = &route.path {
            if !path_re.is_match(path) {
                return Err(ConfigError::Validation(format!("invalid path override: {}", path)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::config::RouteDeclaration;
    use rstest::rstest;

    #[rstest]
    #[case("/api/test", true)]
    #[case("/v1/blog-posts", true)]
    #[case("api/test", false)]
    #[case("/api/test/", false)]
    #[case("/api/{id}", false)]
    #[case("/", false)]
    fn path_overrides(#[case] path: &str, #[case] ok: bool) {
        let m = EntityManifest::new("Thing").route(RouteDeclaration::new(Capability::Findable).path(path));
        assert_eq!(validate_manifest(&m).is_ok(), ok, "{path}");
    }

    #[test]
    fn duplicate_capability_rejected() {
        let m = EntityManifest::new("Thing")
            .route(RouteDeclaration::new(Capability::Creatable))
            .route(RouteDeclaration::new(Capability::Creatable).path("/x"));
        assert!(validate_manifest(&m).is_err());
    }
}
