//! Application configuration.
//!
//! Loaded from an optional YAML file, then overridden by environment
//! variables prefixed with `ADMINKIT__` where `__` separates nesting levels
//! (`ADMINKIT__DATABASE__URL`, `ADMINKIT__LOGGING__JSON`).

use std::path::Path;

use adminkit_db::{DatabaseConfig, EntityDescriptor, MetadataRegistry};
use adminkit_pipeline::PipelineConfig;
use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use privilege_resolver::config::{PrivilegeResolverConfig, StaticSourceConfig};
use serde::Deserialize;

use crate::logging::LoggingConfig;

pub const ENV_PREFIX: &str = "ADMINKIT__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub privilege_resolver: PrivilegeResolverConfig,
    /// Organizations, roles and assignments served to the resolver.
    pub privileges: StaticSourceConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    pub entities: Vec<EntityDescriptor>,
}

impl AppConfig {
    /// Layer `path` (when given) and the environment.
    ///
    /// # Errors
    /// Fails if the file is missing or any layer does not match the schema.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            anyhow::ensure!(path.is_file(), "config file not found: {}", path.display());
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }

    /// Build and validate the entity registry described by `entities`.
    ///
    /// # Errors
    /// Fails on duplicate entities or dangling relationships.
    pub fn metadata(&self) -> anyhow::Result<MetadataRegistry> {
        let mut registry = MetadataRegistry::new();
        for desc in &self.entities {
            registry
                .register_descriptor(desc.clone())
                .with_context(|| format!("entity '{}'", desc.name))?;
        }
        registry.validate()?;
        Ok(registry)
    }
}
