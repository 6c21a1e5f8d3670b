//! Public API trait for the privilege resolver.

use adminkit_security::{PrivilegesDesc, SecurityContext};
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PrivilegeResolverError;

/// Public API trait for the privilege resolver.
///
/// Constructed at startup and handed to the data-access pipeline:
///
/// ```ignore
/// let privileges = resolver.resolve(&ctx).await?;
/// ```
#[async_trait]
pub trait PrivilegeResolverClient: Send + Sync {
    /// Resolve the effective privileges of `ctx.principal_id()` acting in
    /// `ctx.active_org_id()`.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the principal holds no valid role assignment
    /// - `ResolutionFailed` if the organization tree cannot be loaded or a
    ///   privilege references an unknown organization
    /// - `Internal` for unexpected errors
    async fn resolve(&self, ctx: &SecurityContext) -> Result<PrivilegesDesc, PrivilegeResolverError>;

    /// Drop every cached resolution for `user_id`. Called after role or
    /// assignment mutations.
    ///
    /// # Errors
    ///
    /// - `Internal` if the cache backend fails
    async fn invalidate(&self, user_id: Uuid) -> Result<(), PrivilegeResolverError>;
}
