//! Privilege source backed by configuration.

use async_trait::async_trait;
use privilege_resolver_sdk::{
    Organization, PrivilegeResolverError, PrivilegeSource, Role, RoleAssignment,
};
use uuid::Uuid;

use crate::config::StaticSourceConfig;

/// Serves organizations, roles and assignments loaded once from config.
#[derive(Debug, Clone, Default)]
pub struct StaticPrivilegeSource {
    organizations: Vec<Organization>,
    roles: Vec<Role>,
    assignments: Vec<RoleAssignment>,
}

impl StaticPrivilegeSource {
    #[must_use]
    pub fn new(cfg: StaticSourceConfig) -> Self {
        tracing::info!(
            organizations = cfg.organizations.len(),
            roles = cfg.roles.len(),
            assignments = cfg.assignments.len(),
            "static privilege source loaded"
        );
        Self {
            organizations: cfg.organizations,
            roles: cfg.roles,
            assignments: cfg.assignments,
        }
    }
}

#[async_trait]
impl PrivilegeSource for StaticPrivilegeSource {
    async fn assignments(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, PrivilegeResolverError> {
        Ok(self
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .copied()
            .collect())
    }

    async fn roles(&self, role_ids: &[Uuid]) -> Result<Vec<Role>, PrivilegeResolverError> {
        Ok(self
            .roles
            .iter()
            .filter(|r| role_ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn organizations(&self) -> Result<Vec<Organization>, PrivilegeResolverError> {
        Ok(self.organizations.clone())
    }
}
