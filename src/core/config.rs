//! Run configuration loaded from `registry.toml`.
//!
//! Every key is optional; the resolver database becomes required only for
//! commands that classify scripts (`require_resolver_database`).

use crate::core::error::RegistryError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "registry.toml";

/// Environment override for `resolver.database`.
pub const RESOLVER_DB_ENV: &str = "REGISTRY_RESOLVER_DB";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub legacy_dir: PathBuf,
    pub registry_dir: PathBuf,
    pub metadata: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            legacy_dir: PathBuf::from("dApps"),
            registry_dir: PathBuf::from("dApps_v2"),
            metadata: PathBuf::from("dApps_v2").join("metadata-mapping.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub sources: Vec<PathBuf>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        let base = PathBuf::from("eternl").join("ssdata");
        Self {
            sources: vec![base.join("orders.csv"), base.join("pools.csv")],
        }
    }
}

/// Extra alias entry: a raw source name mapped to a canonical key and output file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AliasConfig {
    pub key: String,
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub paths: PathsConfig,
    pub resolver: ResolverConfig,
    pub import: ImportConfig,
    pub aliases: BTreeMap<String, AliasConfig>,
}

impl RegistryConfig {
    /// Load the config at `path`, or defaults when the file is absent.
    ///
    /// Relative paths inside the file are resolved against its directory, and
    /// `REGISTRY_RESOLVER_DB` overrides the resolver database.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(RegistryError::IoError)?;
            let parsed: RegistryConfig = toml::from_str(&content).map_err(|e| {
                RegistryError::ConfigError(format!("{}: {}", path.display(), e))
            })?;
            parsed
        } else {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            RegistryConfig::default()
        };

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_relative_to(base);

        if let Ok(db) = std::env::var(RESOLVER_DB_ENV) {
            if !db.trim().is_empty() {
                config.resolver.database = Some(PathBuf::from(db.trim()));
            }
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() && !base.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.paths.legacy_dir);
        join(&mut self.paths.registry_dir);
        join(&mut self.paths.metadata);
        if let Some(db) = self.resolver.database.as_mut() {
            join(db);
        }
        for source in &mut self.import.sources {
            join(source);
        }
    }

    /// The resolver database path; missing or nonexistent is a setup error.
    pub fn require_resolver_database(&self) -> Result<&Path, RegistryError> {
        let db = self.resolver.database.as_deref().ok_or_else(|| {
            RegistryError::ConfigError(format!(
                "missing required configuration: resolver.database (or {})",
                RESOLVER_DB_ENV
            ))
        })?;
        if !db.is_file() {
            return Err(RegistryError::ConfigError(format!(
                "resolver database not found: {}",
                db.display()
            )));
        }
        Ok(db)
    }
}
