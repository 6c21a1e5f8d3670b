//! Per-entity lifecycle capabilities.
//!
//! An entity opts into a lifecycle step by registering an implementation of
//! the matching trait; the built-in callbacks look the capability up by entity
//! name and skip the step when none is registered.

use std::collections::HashMap;
use std::sync::Arc;

use adminkit_db::{CompiledFilter, Record};
use adminkit_security::SecurityContext;

pub trait BeforeCreate: Send + Sync {
    /// # Errors
    /// Aborts the create.
    fn before_create(&self, record: &mut Record, ctx: &SecurityContext) -> anyhow::Result<()>;
}

pub trait AfterCreate: Send + Sync {
    /// # Errors
    /// Aborts the create and rolls the insert back.
    fn after_create(&self, record: &Record, ctx: &SecurityContext) -> anyhow::Result<()>;
}

pub trait BeforeUpdate: Send + Sync {
    /// # Errors
    /// Aborts the update.
    fn before_update(&self, changes: &mut Record, ctx: &SecurityContext) -> anyhow::Result<()>;
}

pub trait BeforeDelete: Send + Sync {
    /// # Errors
    /// Aborts the delete.
    fn before_delete(&self, filter: &CompiledFilter, ctx: &SecurityContext) -> anyhow::Result<()>;
}

pub trait AfterFind: Send + Sync {
    /// Called once per returned row.
    ///
    /// # Errors
    /// Aborts the query.
    fn after_find(&self, record: &mut Record, ctx: &SecurityContext) -> anyhow::Result<()>;
}

/// Capabilities keyed by entity name. Built once at startup.
#[derive(Default)]
pub struct LifecycleRegistry {
    before_create: HashMap<String, Arc<dyn BeforeCreate>>,
    after_create: HashMap<String, Arc<dyn AfterCreate>>,
    before_update: HashMap<String, Arc<dyn BeforeUpdate>>,
    before_delete: HashMap<String, Arc<dyn BeforeDelete>>,
    after_find: HashMap<String, Arc<dyn AfterFind>>,
}

impl LifecycleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_before_create(mut self, entity: impl Into<String>, hook: Arc<dyn BeforeCreate>) -> Self {
        self.before_create.insert(entity.into(), hook);
        self
    }

    #[must_use]
    pub fn on_after_create(mut self, entity: impl Into<String>, hook: Arc<dyn AfterCreate>) -> Self {
        self.after_create.insert(entity.into(), hook);
        self
    }

    #[must_use]
    pub fn on_before_update(mut self, entity: impl Into<String>, hook: Arc<dyn BeforeUpdate>) -> Self {
        self.before_update.insert(entity.into(), hook);
        self
    }

    #[must_use]
    pub fn on_before_delete(mut self, entity: impl Into<String>, hook: Arc<dyn BeforeDelete>) -> Self {
        self.before_delete.insert(entity.into(), hook);
        self
    }

    #[must_use]
    pub fn on_after_find(mut self, entity: impl Into<String>, hook: Arc<dyn AfterFind>) -> Self {
        self.after_find.insert(entity.into(), hook);
        self
    }

    #[must_use]
    pub fn before_create(&self, entity: &str) -> Option<Arc<dyn BeforeCreate>> {
        self.before_create.get(entity).cloned()
    }

    #[must_use]
    pub fn after_create(&self, entity: &str) -> Option<Arc<dyn AfterCreate>> {
        self.after_create.get(entity).cloned()
    }

    #[must_use]
    pub fn before_update(&self, entity: &str) -> Option<Arc<dyn BeforeUpdate>> {
        self.before_update.get(entity).cloned()
    }

    #[must_use]
    pub fn before_delete(&self, entity: &str) -> Option<Arc<dyn BeforeDelete>> {
        self.before_delete.get(entity).cloned()
    }

    #[must_use]
    pub fn after_find(&self, entity: &str) -> Option<Arc<dyn AfterFind>> {
        self.after_find.get(entity).cloned()
    }
}
