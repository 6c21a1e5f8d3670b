//! Callback types: the phase a callback runs in, the handler trait and the
//! registration entry carrying ordering constraints.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::scope::Scope;

/// Operation kind a callback chain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Create,
    Update,
    Delete,
    Query,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Create, Phase::Update, Phase::Delete, Phase::Query];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Delete => "delete",
            Phase::Query => "query",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step of an operation.
///
/// Returning an error aborts the chain and rolls the transaction back. A
/// [`PipelineError`](crate::PipelineError) returned through `anyhow` is
/// surfaced unchanged; any other error becomes
/// [`PipelineError::Hook`](crate::PipelineError::Hook).
#[async_trait]
pub trait Callback: Send + Sync {
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()>;
}

struct FnCallback<F>(F);

#[async_trait]
impl<F> Callback for FnCallback<F>
where
    F: Fn(&mut Scope<'_>) -> anyhow::Result<()> + Send + Sync,
{
    async fn call(&self, scope: &mut Scope<'_>) -> anyhow::Result<()> {
        (self.0)(scope)
    }
}

/// Wrap a synchronous closure as a callback.
#[must_use]
pub fn callback_fn<F>(f: F) -> Arc<dyn Callback>
where
    F: Fn(&mut Scope<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnCallback(f))
}

/// Registration entry: a named handler for one phase with optional
/// placement constraints.
#[derive(Clone)]
pub struct Processor {
    pub(crate) phase: Phase,
    pub(crate) name: String,
    pub(crate) handler: Arc<dyn Callback>,
    pub(crate) before: Option<String>,
    pub(crate) after: Option<String>,
}

impl Processor {
    #[must_use]
    pub fn new(phase: Phase, name: impl Into<String>, handler: Arc<dyn Callback>) -> Self {
        Self {
            phase,
            name: name.into(),
            handler,
            before: None,
            after: None,
        }
    }

    /// Run immediately before `anchor`.
    #[must_use]
    pub fn before(mut self, anchor: impl Into<String>) -> Self {
        self.before = Some(anchor.into());
        self
    }

    /// Run immediately after `anchor`.
    #[must_use]
    pub fn after(mut self, anchor: impl Into<String>) -> Self {
        self.after = Some(anchor.into());
        self
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("phase", &self.phase)
            .field("name", &self.name)
            .field("before", &self.before)
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}
