//! Callbacks that run the statement of each phase.

use adminkit_db::cond::build_condition;
use adminkit_db::metadata::FieldTag;
use adminkit_db::scope::owner_org_field;
use adminkit_db::store::{count_rows, delete_rows, insert_row, select_rows, update_rows};
use async_trait::async_trait;
use sea_orm::Condition;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::callback::Callback;
use crate::error::PipelineError;
use crate::scope::Scope;

fn condition(scope: &Scope<'_>) -> Condition {
    build_condition(&scope.filter().predicate())
}

/// Selects one page of rows, plus the total when asked.
pub struct QueryRows;

#[async_trait]
impl Callback for QueryRows {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let cond = condition(scope);
        let page = scope.page();
        let limit = scope.env().config.page_limit(page.limit);

        let rows = select_rows(scope.txn(), scope.meta(), cond.clone(), page.offset, Some(limit))
            .await
            .map_err(PipelineError::from)?;
        let total = if page.with_total {
            Some(
                count_rows(scope.txn(), scope.meta(), cond)
                    .await
                    .map_err(PipelineError::from)?,
            )
        } else {
            None
        };

        let outcome = scope.outcome_mut();
        outcome.rows = rows;
        outcome.total = total;
        Ok(())
    }
}

pub struct CreateRow;

#[async_trait]
impl Callback for CreateRow {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let affected = insert_row(scope.txn(), scope.meta(), scope.payload())
            .await
            .map_err(PipelineError::from)?;
        scope.outcome_mut().affected = affected;
        Ok(())
    }
}

/// Whether the changes keep the rows inside the writable organizations.
/// Changes that leave the organization untouched always do.
fn changes_stay_writable(scope: &Scope<'_>) -> bool {
    let Some(privileges) = scope.privileges() else {
        return true;
    };
    if privileges.bypass || scope.meta().is_unrestricted() {
        return true;
    }
    let Some(org_field) = owner_org_field(scope.meta()) else {
        return true;
    };
    let Some(target) = scope.payload().get(&org_field.name) else {
        return true;
    };
    target
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .is_some_and(|org| privileges.writable_orgs_for(scope.entity()).contains(&org))
}

/// Applies the changes to every row in scope. Moving rows into an
/// organization outside the write scope affects nothing.
pub struct UpdateRows;

#[async_trait]
impl Callback for UpdateRows {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        if !changes_stay_writable(scope) {
            debug!(entity = %scope.entity(), "changes leave the write scope; nothing updated");
            scope.outcome_mut().affected = 0;
            return Ok(());
        }
        let cond = condition(scope);
        let affected = update_rows(scope.txn(), scope.meta(), scope.payload(), cond)
            .await
            .map_err(PipelineError::from)?;
        scope.outcome_mut().affected = affected;
        Ok(())
    }
}

/// Deletes every row in scope, or stamps the soft-delete field when the
/// entity has one.
pub struct DeleteRows;

#[async_trait]
impl Callback for DeleteRows {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let cond = condition(scope);
        let soft_delete = scope
            .meta()
            .tagged(FieldTag::SoftDelete)
            .map(|f| f.name.clone());

        let result = if let Some(field) = soft_delete {
            scope
                .payload_mut()
                .insert(field, Value::String(chrono::Utc::now().to_rfc3339()));
            update_rows(scope.txn(), scope.meta(), scope.payload(), cond).await
        } else {
            delete_rows(scope.txn(), scope.meta(), cond).await
        };
        scope.outcome_mut().affected = result.map_err(PipelineError::from)?;
        Ok(())
    }
}
