//! Per-operation state handed to every callback.

use std::sync::Arc;

use adminkit_db::metadata::{EntityMeta, MetadataRegistry};
use adminkit_db::{CompiledFilter, Page, Record};
use adminkit_security::{PrivilegesDesc, SecurityContext};
use sea_orm::DatabaseTransaction;
use serde_json::Value;

use crate::callback::Phase;
use crate::error::PipelineError;
use crate::pipeline::{Env, Outcome};

/// State of one operation, owned by it and dropped when it ends.
///
/// Callbacks read the request (entity, principal, raw filter, payload, page),
/// build up the compiled filter and the outcome, and may stop the chain with
/// [`Scope::skip_rest`]. Every statement runs on [`Scope::txn`].
pub struct Scope<'a> {
    phase: Phase,
    meta: Arc<EntityMeta>,
    env: &'a Env,
    txn: &'a DatabaseTransaction,
    ctx: &'a SecurityContext,
    filter_input: Value,
    filter: CompiledFilter,
    payload: Record,
    page: Page,
    privileges: Option<PrivilegesDesc>,
    outcome: Outcome,
    short_circuited: bool,
}

/// Request half of a scope.
pub(crate) struct Request {
    pub(crate) phase: Phase,
    pub(crate) filter: Value,
    pub(crate) payload: Record,
    pub(crate) page: Page,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        req: Request,
        meta: Arc<EntityMeta>,
        env: &'a Env,
        txn: &'a DatabaseTransaction,
        ctx: &'a SecurityContext,
    ) -> Self {
        Self {
            phase: req.phase,
            meta,
            env,
            txn,
            ctx,
            filter_input: req.filter,
            filter: CompiledFilter::default(),
            payload: req.payload,
            page: req.page,
            privileges: None,
            outcome: Outcome::default(),
            short_circuited: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        self.meta.name()
    }

    #[must_use]
    pub fn registry(&self) -> &MetadataRegistry {
        &self.env.metadata
    }

    #[must_use]
    pub fn txn(&self) -> &'a DatabaseTransaction {
        self.txn
    }

    #[must_use]
    pub fn ctx(&self) -> &'a SecurityContext {
        self.ctx
    }

    /// The filter as the client sent it.
    #[must_use]
    pub fn filter_input(&self) -> &Value {
        &self.filter_input
    }

    #[must_use]
    pub fn filter(&self) -> &CompiledFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut CompiledFilter {
        &mut self.filter
    }

    /// Record to create, or changes to apply on update and soft delete.
    #[must_use]
    pub fn payload(&self) -> &Record {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Record {
        &mut self.payload
    }

    #[must_use]
    pub fn page(&self) -> Page {
        self.page
    }

    /// Privileges, once a callback resolved them.
    #[must_use]
    pub fn privileges(&self) -> Option<&PrivilegesDesc> {
        self.privileges.as_ref()
    }

    /// Resolve the principal's privileges, at most once per operation.
    ///
    /// # Errors
    /// [`PipelineError::Unauthorized`] or [`PipelineError::ResolutionFailed`]
    /// from the privilege resolver.
    pub async fn ensure_privileges(&mut self) -> Result<&PrivilegesDesc, PipelineError> {
        if self.privileges.is_none() {
            let resolved = self.env.privileges.resolve(self.ctx).await?;
            self.privileges = Some(resolved);
        }
        self.privileges
            .as_ref()
            .ok_or_else(|| PipelineError::ResolutionFailed("privileges not resolved".to_owned()))
    }

    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn outcome_mut(&mut self) -> &mut Outcome {
        &mut self.outcome
    }

    /// Stop the chain after the current callback. The operation still
    /// commits.
    pub fn skip_rest(&mut self) {
        self.short_circuited = true;
    }

    #[must_use]
    pub fn is_short_circuited(&self) -> bool {
        self.short_circuited
    }

    pub(crate) fn env(&self) -> &'a Env {
        self.env
    }

    pub(crate) fn into_outcome(self) -> Outcome {
        self.outcome
    }
}
