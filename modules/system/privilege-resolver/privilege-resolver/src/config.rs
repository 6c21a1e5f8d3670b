//! Configuration for the privilege resolver.

use adminkit_security::constants::DEFAULT_ROOT_PRINCIPAL_ID;
use privilege_resolver_sdk::{Organization, Role, RoleAssignment};
use serde::Deserialize;
use uuid::Uuid;

/// Resolver configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrivilegeResolverConfig {
    /// Principal resolved as root: every scope check is bypassed.
    pub root_user_id: Uuid,
    /// Cache resolved privileges per role set.
    pub cache_enabled: bool,
}

impl Default for PrivilegeResolverConfig {
    fn default() -> Self {
        Self {
            root_user_id: DEFAULT_ROOT_PRINCIPAL_ID,
            cache_enabled: true,
        }
    }
}

/// Organizations, roles and assignments served by
/// [`StaticPrivilegeSource`](crate::domain::StaticPrivilegeSource).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticSourceConfig {
    pub organizations: Vec<Organization>,
    pub roles: Vec<Role>,
    pub assignments: Vec<RoleAssignment>,
}
