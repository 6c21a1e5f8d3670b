//! Pipeline executor: runs a phase's resolved callback chain inside a
//! transaction.

use std::sync::Arc;

use adminkit_db::metadata::MetadataRegistry;
use adminkit_db::{Db, Page, Record};
use adminkit_security::SecurityContext;
use privilege_resolver_sdk::PrivilegeResolverClient;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::audit::{AuditSink, TracingAuditSink};
use crate::callback::Phase;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::lifecycle::LifecycleRegistry;
use crate::registry::{CallbackRegistry, ResolvedCallback};
use crate::scope::{Request, Scope};

/// Result of an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Rows returned by a query.
    pub rows: Vec<Record>,
    /// Total matching rows, when the page asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Rows written by create, update or delete.
    pub affected: u64,
}

/// Collaborators shared by every operation.
pub(crate) struct Env {
    pub(crate) metadata: Arc<MetadataRegistry>,
    pub(crate) privileges: Arc<dyn PrivilegeResolverClient>,
    pub(crate) lifecycle: Arc<LifecycleRegistry>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) config: PipelineConfig,
}

pub struct Pipeline {
    db: Db,
    callbacks: Arc<CallbackRegistry>,
    env: Env,
}

pub struct PipelineBuilder {
    db: Db,
    metadata: Arc<MetadataRegistry>,
    privileges: Arc<dyn PrivilegeResolverClient>,
    callbacks: Option<Arc<CallbackRegistry>>,
    lifecycle: Arc<LifecycleRegistry>,
    audit: Arc<dyn AuditSink>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Callback registry; defaults to [`CallbackRegistry::with_builtins`].
    #[must_use]
    pub fn callbacks(mut self, callbacks: Arc<CallbackRegistry>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    #[must_use]
    pub fn lifecycle(mut self, lifecycle: LifecycleRegistry) -> Self {
        self.lifecycle = Arc::new(lifecycle);
        self
    }

    /// Audit sink; defaults to [`TracingAuditSink`].
    #[must_use]
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            db: self.db,
            callbacks: self
                .callbacks
                .unwrap_or_else(|| Arc::new(CallbackRegistry::with_builtins())),
            env: Env {
                metadata: self.metadata,
                privileges: self.privileges,
                lifecycle: self.lifecycle,
                audit: self.audit,
                config: self.config,
            },
        }
    }
}

impl Pipeline {
    #[must_use]
    pub fn builder(
        db: Db,
        metadata: Arc<MetadataRegistry>,
        privileges: Arc<dyn PrivilegeResolverClient>,
    ) -> PipelineBuilder {
        PipelineBuilder {
            db,
            metadata,
            privileges,
            callbacks: None,
            lifecycle: Arc::new(LifecycleRegistry::new()),
            audit: Arc::new(TracingAuditSink),
            config: PipelineConfig::default(),
        }
    }

    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Rows of `entity` matching `filter` within the principal's read scope.
    ///
    /// # Errors
    /// See [`PipelineError`]. Rows outside the scope are filtered, not
    /// reported.
    pub async fn query(
        &self,
        ctx: &SecurityContext,
        entity: &str,
        filter: &Value,
        page: Page,
    ) -> Result<Outcome, PipelineError> {
        let req = Request {
            phase: Phase::Query,
            filter: filter.clone(),
            payload: Record::new(),
            page,
        };
        self.run(ctx, entity, req).await
    }

    /// Insert `record`. A record outside the principal's write scope is not
    /// inserted and yields zero affected rows.
    ///
    /// # Errors
    /// See [`PipelineError`].
    pub async fn create(
        &self,
        ctx: &SecurityContext,
        entity: &str,
        record: Record,
    ) -> Result<Outcome, PipelineError> {
        let req = Request {
            phase: Phase::Create,
            filter: Value::Null,
            payload: record,
            page: Page::default(),
        };
        self.run(ctx, entity, req).await
    }

    /// Apply `changes` to rows matching `filter` within the write scope.
    ///
    /// # Errors
    /// See [`PipelineError`].
    pub async fn update(
        &self,
        ctx: &SecurityContext,
        entity: &str,
        filter: &Value,
        changes: Record,
    ) -> Result<Outcome, PipelineError> {
        let req = Request {
            phase: Phase::Update,
            filter: filter.clone(),
            payload: changes,
            page: Page::default(),
        };
        self.run(ctx, entity, req).await
    }

    /// Delete rows matching `filter` within the write scope. Entities with a
    /// `soft_delete` field are stamped instead of deleted.
    ///
    /// # Errors
    /// See [`PipelineError`].
    pub async fn delete(
        &self,
        ctx: &SecurityContext,
        entity: &str,
        filter: &Value,
    ) -> Result<Outcome, PipelineError> {
        let req = Request {
            phase: Phase::Delete,
            filter: filter.clone(),
            payload: Record::new(),
            page: Page::default(),
        };
        self.run(ctx, entity, req).await
    }

    #[tracing::instrument(
        skip_all,
        fields(phase = %req.phase, entity = %entity, user_id = %ctx.principal_id())
    )]
    async fn run(
        &self,
        ctx: &SecurityContext,
        entity: &str,
        req: Request,
    ) -> Result<Outcome, PipelineError> {
        let meta = self
            .env
            .metadata
            .get(entity)
            .ok_or_else(|| PipelineError::UnknownEntity(entity.to_owned()))?;
        let chain = self.callbacks.chain(req.phase);

        let txn = self.db.begin().await?;
        let result = {
            let mut scope = Scope::new(req, meta, &self.env, &txn, ctx);
            execute(&chain, &mut scope).await.map(|()| scope.into_outcome())
        };

        match result {
            Ok(outcome) => {
                txn.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rb) = txn.rollback().await {
                    warn!(error = %rb, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

async fn execute(chain: &[ResolvedCallback], scope: &mut Scope<'_>) -> Result<(), PipelineError> {
    for cb in chain {
        if scope.is_short_circuited() {
            debug!(next = %cb.name, "chain short-circuited");
            break;
        }
        if let Err(e) = cb.handler.call(scope).await {
            let err = into_pipeline_error(&cb.name, e);
            warn!(callback = %cb.name, error = %err, "callback failed; rolling back");
            return Err(err);
        }
    }
    Ok(())
}

/// Errors raised as [`PipelineError`] pass through; anything else is a hook
/// failure attributed to `name`.
fn into_pipeline_error(name: &str, e: anyhow::Error) -> PipelineError {
    match e.downcast::<PipelineError>() {
        Ok(err) => err,
        Err(other) => PipelineError::Hook {
            name: name.to_owned(),
            message: format!("{other:#}"),
        },
    }
}
