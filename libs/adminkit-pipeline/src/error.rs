//! Pipeline and registry errors.

use adminkit_db::{CompileError, DbError};
use privilege_resolver_sdk::PrivilegeResolverError;
use thiserror::Error;

use crate::callback::Phase;

/// Failure of a pipeline operation. Rows hidden by the principal's scope are
/// not an error: they surface as an empty result or zero affected rows.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("privilege resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("filter compilation failed: {0}")]
    CompilationFailed(String),

    /// A callback returned an error; the transaction was rolled back.
    #[error("callback '{name}' failed: {message}")]
    Hook { name: String, message: String },

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl PipelineError {
    /// Whether the caller is at fault (bad request or authentication), as
    /// opposed to a server-side failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::CompilationFailed(_) | Self::UnknownEntity(_)
        )
    }
}

impl From<CompileError> for PipelineError {
    fn from(e: CompileError) -> Self {
        match e {
            CompileError::CompilationFailed(msg) => Self::CompilationFailed(msg),
        }
    }
}

impl From<PrivilegeResolverError> for PipelineError {
    fn from(e: PrivilegeResolverError) -> Self {
        match e {
            PrivilegeResolverError::Unauthorized { .. } => Self::Unauthorized(e.to_string()),
            PrivilegeResolverError::ResolutionFailed(msg) | PrivilegeResolverError::Internal(msg) => {
                Self::ResolutionFailed(msg)
            }
        }
    }
}

impl From<sea_orm::DbErr> for PipelineError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Db(DbError::Sea(e))
    }
}

/// Rejected registry mutation. The previously resolved chains stay in force.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("callback ordering cycle in {phase} phase among: {}", names.join(", "))]
    Cycle { phase: Phase, names: Vec<String> },

    #[error("callback name must not be empty")]
    EmptyName,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn classifies_client_errors() {
        assert!(PipelineError::CompilationFailed("x".to_owned()).is_client_error());
        assert!(
            PipelineError::from(PrivilegeResolverError::Unauthorized {
                user_id: Uuid::nil()
            })
            .is_client_error()
        );
        assert!(!PipelineError::ResolutionFailed("x".to_owned()).is_client_error());
        assert!(
            !PipelineError::Hook {
                name: "a".to_owned(),
                message: "b".to_owned()
            }
            .is_client_error()
        );
    }
}
