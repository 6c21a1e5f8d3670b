//! Error types for the privilege resolver module.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when resolving privileges.
///
/// Neither kind is retried by the resolver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrivilegeResolverError {
    /// The principal holds no valid role assignment.
    #[error("principal {user_id} has no valid role assignment")]
    Unauthorized { user_id: Uuid },

    /// The organization tree could not be loaded or is inconsistent.
    #[error("privilege resolution failed: {0}")]
    ResolutionFailed(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
