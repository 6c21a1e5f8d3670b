//! Entity lifecycle steps, secret redaction and the audit record.

use async_trait::async_trait;

use crate::audit::AuditEvent;
use crate::callback::{Callback, Phase};
use crate::scope::Scope;

/// Runs the entity's lifecycle capability for one step, if it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    BeforeDelete,
    AfterFind,
}

#[async_trait]
impl Callback for LifecycleStep {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let lifecycle = &scope.env().lifecycle;
        let ctx = scope.ctx();
        let entity = scope.entity().to_owned();
        match self {
            Self::BeforeCreate => {
                if let Some(hook) = lifecycle.before_create(&entity) {
                    hook.before_create(scope.payload_mut(), ctx)?;
                }
            }
            Self::AfterCreate => {
                if let Some(hook) = lifecycle.after_create(&entity)
                    && scope.outcome().affected > 0
                {
                    hook.after_create(scope.payload(), ctx)?;
                }
            }
            Self::BeforeUpdate => {
                if let Some(hook) = lifecycle.before_update(&entity) {
                    hook.before_update(scope.payload_mut(), ctx)?;
                }
            }
            Self::BeforeDelete => {
                if let Some(hook) = lifecycle.before_delete(&entity) {
                    hook.before_delete(scope.filter(), ctx)?;
                }
            }
            Self::AfterFind => {
                if let Some(hook) = lifecycle.after_find(&entity) {
                    for row in &mut scope.outcome_mut().rows {
                        hook.after_find(row, ctx)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Strips fields tagged `secret` from returned rows.
pub struct RedactSecrets;

#[async_trait]
impl Callback for RedactSecrets {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let secrets: Vec<String> = scope.meta().secret_fields().map(|f| f.name.clone()).collect();
        if secrets.is_empty() {
            return Ok(());
        }
        for row in &mut scope.outcome_mut().rows {
            for name in &secrets {
                row.remove(name);
            }
        }
        Ok(())
    }
}

/// Hands a summary of the operation to the audit sink.
pub struct Audit;

#[async_trait]
impl Callback for Audit {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let outcome = scope.outcome();
        let rows = if scope.phase() == Phase::Query {
            u64::try_from(outcome.rows.len()).unwrap_or(u64::MAX)
        } else {
            outcome.affected
        };
        let ctx = scope.ctx();
        let event = AuditEvent {
            phase: scope.phase(),
            entity: scope.entity().to_owned(),
            principal_id: ctx.principal_id(),
            active_org_id: ctx.active_org_id(),
            rows,
        };
        scope.env().audit.record(event).await;
        Ok(())
    }
}
