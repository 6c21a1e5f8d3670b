//! Local (in-process) client for the privilege resolver.

use std::sync::Arc;

use adminkit_security::{PrivilegesDesc, SecurityContext};
use async_trait::async_trait;
use privilege_resolver_sdk::{PrivilegeResolverClient, PrivilegeResolverError};
use uuid::Uuid;

use super::{DomainError, Service};

/// Local client wrapping the service.
pub struct PrivilegeResolverLocalClient {
    svc: Arc<Service>,
}

impl PrivilegeResolverLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> PrivilegeResolverError {
    match &e {
        DomainError::NoAssignments { .. } => {
            tracing::debug!(operation = op, error = %e, "privilege_resolver denied");
        }
        _ => tracing::error!(operation = op, error = ?e, "privilege_resolver call failed"),
    }
    e.into()
}

#[async_trait]
impl PrivilegeResolverClient for PrivilegeResolverLocalClient {
    async fn resolve(&self, ctx: &SecurityContext) -> Result<PrivilegesDesc, PrivilegeResolverError> {
        self.svc
            .resolve(ctx)
            .await
            .map_err(|e| log_and_convert("resolve", e))
    }

    async fn invalidate(&self, user_id: Uuid) -> Result<(), PrivilegeResolverError> {
        self.svc
            .invalidate(user_id)
            .await
            .map_err(|e| log_and_convert("invalidate", e))
    }
}
