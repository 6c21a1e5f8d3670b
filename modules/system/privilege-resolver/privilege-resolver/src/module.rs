//! Privilege resolver module wiring.

use std::sync::Arc;

use privilege_resolver_sdk::{PrivilegeResolverClient, PrivilegeSource};
use tracing::info;

use crate::config::{PrivilegeResolverConfig, StaticSourceConfig};
use crate::domain::{InMemoryPrivilegeCache, PrivilegeCache, PrivilegeResolverLocalClient, Service, StaticPrivilegeSource};

/// Privilege resolver module.
///
/// Built once at startup; hands out the in-process client consumed by the
/// data-access pipeline.
pub struct PrivilegeResolverModule {
    service: Arc<Service>,
}

impl PrivilegeResolverModule {
    /// Resolver over `source` with the in-process cache.
    #[must_use]
    pub fn new(cfg: &PrivilegeResolverConfig, source: Arc<dyn PrivilegeSource>) -> Self {
        let cache: Arc<dyn PrivilegeCache> = Arc::new(InMemoryPrivilegeCache::new());
        Self::with_cache(cfg, source, cache)
    }

    /// Resolver over `source` with a caller-supplied cache backend.
    #[must_use]
    pub fn with_cache(
        cfg: &PrivilegeResolverConfig,
        source: Arc<dyn PrivilegeSource>,
        cache: Arc<dyn PrivilegeCache>,
    ) -> Self {
        info!(
            root_user_id = %cfg.root_user_id,
            cache_enabled = cfg.cache_enabled,
            "Initializing privilege-resolver module"
        );
        Self {
            service: Arc::new(Service::new(source, Some(cache), cfg)),
        }
    }

    /// Resolver over organizations, roles and assignments from config.
    #[must_use]
    pub fn from_static(cfg: &PrivilegeResolverConfig, source: StaticSourceConfig) -> Self {
        Self::new(cfg, Arc::new(StaticPrivilegeSource::new(source)))
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn PrivilegeResolverClient> {
        Arc::new(PrivilegeResolverLocalClient::new(self.service.clone()))
    }
}
