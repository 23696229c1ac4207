//! Process settings from the environment (and `.env` when present).

use crate::error::ConfigError;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Directory scanned for entity manifests.
    pub entity_dir: PathBuf,
    /// Where the generated routing table is cached.
    pub cache_dir: PathBuf,
    pub bind_addr: String,
    pub max_body_bytes: usize,
}

const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        let max_body_bytes = match std::env::var("MAX_BODY_BYTES") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::Env(format!("MAX_BODY_BYTES must be a byte count, got '{}'", v)))?,
            Err(_) => DEFAULT_MAX_BODY_BYTES,
        };
        Ok(Settings {
            database_url: var("DATABASE_URL", "postgres://localhost/entity_api"),
            entity_dir: PathBuf::from(var("ENTITY_DIR", "entities")),
            cache_dir: PathBuf::from(var("CACHE_DIR", "var/cache")),
            bind_addr: var("BIND_ADDR", "127.0.0.1:3000"),
            max_body_bytes,
        })
    }
}
