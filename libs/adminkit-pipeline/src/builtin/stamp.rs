//! Ownership stamping and the create-time write-scope check.

use adminkit_db::metadata::FieldTag;
use adminkit_db::scope::{id_value, owner_org_field, record_in_scope};
use adminkit_security::PrivilegesDesc;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::callback::Callback;
use crate::scope::Scope;

fn field_name(scope: &Scope<'_>, tag: FieldTag) -> Option<String> {
    scope.meta().tagged(tag).map(|f| f.name.clone())
}

/// Sets the owner field to the principal and, when absent, the organization
/// field to the active organization.
pub struct StampOwner;

#[async_trait]
impl Callback for StampOwner {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let ctx = scope.ctx();
        let owner = field_name(scope, FieldTag::Owner);
        let org = field_name(scope, FieldTag::OwnerOrg);
        let payload = scope.payload_mut();
        if let Some(owner) = owner {
            payload.insert(owner, id_value(ctx.principal_id()));
        }
        if let Some(org) = org {
            payload
                .entry(org)
                .or_insert_with(|| id_value(ctx.active_org_id()));
        }
        Ok(())
    }
}

/// Sets the last-modifier field to the principal.
pub struct StampModifier;

#[async_trait]
impl Callback for StampModifier {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let ctx = scope.ctx();
        if let Some(modifier) = field_name(scope, FieldTag::LastModifier) {
            scope
                .payload_mut()
                .insert(modifier, id_value(ctx.principal_id()));
        }
        Ok(())
    }
}

/// Whether the stamped record may be created by the principal.
///
/// Entities owned by an organization check that organization against the
/// writable set; the owner path cannot widen it since the owner was just
/// stamped. A principal with no writable organization at all may only create
/// in its active organization. Entities without an organization field fall
/// back to the full write scope.
fn creatable(scope: &Scope<'_>, privileges: &PrivilegesDesc) -> bool {
    let meta = scope.meta();
    let Some(org_field) = owner_org_field(meta) else {
        return record_in_scope(meta, &privileges.write_scope(meta.name()), scope.payload());
    };
    let Some(org) = scope
        .payload()
        .get(&org_field.name)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
    else {
        return false;
    };
    let writable = privileges.writable_orgs_for(meta.name());
    if writable.is_empty() {
        return org == scope.ctx().active_org_id();
    }
    writable.contains(&org)
}

/// Stops a create whose stamped record falls outside the write scope. The
/// operation completes with zero affected rows.
pub struct CheckWriteScope;

#[async_trait]
impl Callback for CheckWriteScope {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        if scope.meta().is_unrestricted() {
            return Ok(());
        }
        scope.ensure_privileges().await?;
        let allowed = scope
            .privileges()
            .is_some_and(|p| p.bypass || creatable(scope, p));
        if allowed {
            return Ok(());
        }
        debug!(entity = %scope.entity(), "record outside write scope; not created");
        scope.outcome_mut().affected = 0;
        scope.skip_rest();
        Ok(())
    }
}
