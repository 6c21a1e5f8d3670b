//! Domain errors for the privilege resolver.

use privilege_resolver_sdk::PrivilegeResolverError;
use uuid::Uuid;

/// Internal domain errors.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("principal {user_id} has no valid role assignment")]
    NoAssignments { user_id: Uuid },

    #[error("unknown organization {0}")]
    UnknownOrganization(Uuid),

    #[error("organization {org} references missing parent {parent}")]
    DanglingParent { org: Uuid, parent: Uuid },

    #[error("organization {0} is part of a parent cycle")]
    ParentCycle(Uuid),

    #[error("privilege source failed: {0}")]
    Source(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<PrivilegeResolverError> for DomainError {
    fn from(e: PrivilegeResolverError) -> Self {
        match e {
            PrivilegeResolverError::Unauthorized { user_id } => Self::NoAssignments { user_id },
            PrivilegeResolverError::ResolutionFailed(msg) => Self::Source(msg),
            PrivilegeResolverError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<DomainError> for PrivilegeResolverError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NoAssignments { user_id } => Self::Unauthorized { user_id },
            DomainError::UnknownOrganization(_)
            | DomainError::DanglingParent { .. }
            | DomainError::ParentCycle(_)
            | DomainError::Source(_) => Self::ResolutionFailed(e.to_string()),
            DomainError::Internal(msg) => Self::Internal(msg),
        }
    }
}
