//! Filter compilation and scope injection.

use adminkit_db::filter::{self, ColumnRef, CompileOptions, Predicate};
use adminkit_db::metadata::FieldTag;
use adminkit_db::scope::scope_predicate;
use async_trait::async_trait;
use tracing::debug;

use crate::callback::{Callback, Phase};
use crate::error::PipelineError;
use crate::scope::Scope;

/// Compiles the client filter into the scope's filter.
pub struct CompileFilter;

#[async_trait]
impl Callback for CompileFilter {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let opts = CompileOptions {
            max_depth: scope.env().config.max_filter_depth,
        };
        let compiled = filter::compile(scope.filter_input(), scope.meta(), scope.registry(), opts)
            .map_err(PipelineError::from)?;
        *scope.filter_mut() = compiled;
        Ok(())
    }
}

/// ANDs `owner_org IN <orgs> OR owner = <principal>` onto the filter: read
/// orgs for queries, write orgs otherwise. Skipped for unrestricted entities
/// and for the root principal.
pub struct InjectScope;

#[async_trait]
impl Callback for InjectScope {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        if scope.meta().is_unrestricted() {
            return Ok(());
        }
        let phase = scope.phase();
        let entity = scope.entity().to_owned();
        let privileges = scope.ensure_privileges().await?;
        if privileges.bypass {
            debug!(entity = %entity, "scope bypassed for root principal");
            return Ok(());
        }
        let access = if phase == Phase::Query {
            privileges.read_scope(&entity)
        } else {
            privileges.write_scope(&entity)
        };

        let predicate = scope_predicate(scope.meta(), &access, scope.meta().table());
        scope.filter_mut().push_fragment(predicate);
        Ok(())
    }
}

/// Hides soft-deleted rows.
pub struct ExcludeDeleted;

#[async_trait]
impl Callback for ExcludeDeleted {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        let Some(field) = scope.meta().tagged(FieldTag::SoftDelete) else {
            return Ok(());
        };
        let predicate = Predicate::Null {
            column: ColumnRef::new(scope.meta().table(), &field.column),
            negated: false,
        };
        scope.filter_mut().push_fragment(predicate);
        Ok(())
    }
}
