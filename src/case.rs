//! Identifier casing: property names -> wire field names, type names -> path segments, field names -> SQL columns.

/// Lower-case the first character only.
/// e.g. "DisplayName" -> "displayName", "id" -> "id"
pub fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Last `::` segment of a (possibly qualified) type name.
/// e.g. "blog::ApiTestEntity" -> "ApiTestEntity"
pub fn short_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

/// Convert a PascalCase type name to a kebab-case path segment.
/// Every interior uppercase letter gets a leading hyphen, then the whole string is lower-cased.
/// e.g. "ApiTestEntity" -> "api-test-entity"
pub fn to_kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push('-');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "displayName" -> "display_name", "createdAt" -> "created_at"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Path segment for an entity type: kebab-cased short name.
pub fn api_path_segment(type_name: &str) -> String {
    to_kebab_case(short_name(type_name))
}
