//! Storage-side trait the resolver reads assignments, roles and the
//! organization tree from.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PrivilegeResolverError;
use crate::models::{Organization, Role, RoleAssignment};

#[async_trait]
pub trait PrivilegeSource: Send + Sync {
    /// All assignments of `user_id`, expired ones included.
    async fn assignments(&self, user_id: Uuid) -> Result<Vec<RoleAssignment>, PrivilegeResolverError>;

    /// Roles with the given ids. Unknown ids are skipped.
    async fn roles(&self, role_ids: &[Uuid]) -> Result<Vec<Role>, PrivilegeResolverError>;

    /// The whole organization tree.
    async fn organizations(&self) -> Result<Vec<Organization>, PrivilegeResolverError>;
}
