//! Built-in callbacks.
//!
//! | Phase | Order |
//! |-------|-------|
//! | query | `compile_filter`, `inject_scope`, `exclude_deleted`, `query`, `after_find`, `redact_secrets`, `audit` |
//! | create | `before_create`, `stamp_owner`, `check_write_scope`, `create`, `after_create`, `audit` |
//! | update | `compile_filter`, `inject_scope`, `exclude_deleted`, `stamp_modifier`, `before_update`, `update`, `audit` |
//! | delete | `compile_filter`, `inject_scope`, `exclude_deleted`, `before_delete`, `stamp_modifier`, `delete`, `audit` |
//!
//! Every name carries the `adminkit:` prefix; applications anchor their own
//! callbacks on these names.

mod filter;
mod hooks;
mod stamp;
mod statement;

use std::sync::Arc;

use crate::callback::{Callback, Phase, Processor};
use crate::registry::CallbackRegistry;

pub use filter::{CompileFilter, ExcludeDeleted, InjectScope};
pub use hooks::{Audit, LifecycleStep, RedactSecrets};
pub use stamp::{CheckWriteScope, StampModifier, StampOwner};
pub use statement::{CreateRow, DeleteRows, QueryRows, UpdateRows};

pub mod names {
    pub const COMPILE_FILTER: &str = "adminkit:compile_filter";
    pub const INJECT_SCOPE: &str = "adminkit:inject_scope";
    pub const EXCLUDE_DELETED: &str = "adminkit:exclude_deleted";
    pub const QUERY: &str = "adminkit:query";
    pub const AFTER_FIND: &str = "adminkit:after_find";
    pub const REDACT_SECRETS: &str = "adminkit:redact_secrets";
    pub const BEFORE_CREATE: &str = "adminkit:before_create";
    pub const STAMP_OWNER: &str = "adminkit:stamp_owner";
    pub const CHECK_WRITE_SCOPE: &str = "adminkit:check_write_scope";
    pub const CREATE: &str = "adminkit:create";
    pub const AFTER_CREATE: &str = "adminkit:after_create";
    pub const STAMP_MODIFIER: &str = "adminkit:stamp_modifier";
    pub const BEFORE_UPDATE: &str = "adminkit:before_update";
    pub const UPDATE: &str = "adminkit:update";
    pub const BEFORE_DELETE: &str = "adminkit:before_delete";
    pub const DELETE: &str = "adminkit:delete";
    pub const AUDIT: &str = "adminkit:audit";
}

fn cb(callback: impl Callback + 'static) -> Arc<dyn Callback> {
    Arc::new(callback)
}

fn chain(phase: Phase) -> Vec<(&'static str, Arc<dyn Callback>)> {
    use names::{
        AFTER_CREATE, AFTER_FIND, AUDIT, BEFORE_CREATE, BEFORE_DELETE, BEFORE_UPDATE,
        CHECK_WRITE_SCOPE, COMPILE_FILTER, CREATE, DELETE, EXCLUDE_DELETED, INJECT_SCOPE, QUERY,
        REDACT_SECRETS, STAMP_MODIFIER, STAMP_OWNER, UPDATE,
    };

    match phase {
        Phase::Query => vec![
            (COMPILE_FILTER, cb(CompileFilter)),
            (INJECT_SCOPE, cb(InjectScope)),
            (EXCLUDE_DELETED, cb(ExcludeDeleted)),
            (QUERY, cb(QueryRows)),
            (AFTER_FIND, cb(LifecycleStep::AfterFind)),
            (REDACT_SECRETS, cb(RedactSecrets)),
            (AUDIT, cb(Audit)),
        ],
        Phase::Create => vec![
            (BEFORE_CREATE, cb(LifecycleStep::BeforeCreate)),
            (STAMP_OWNER, cb(StampOwner)),
            (CHECK_WRITE_SCOPE, cb(CheckWriteScope)),
            (CREATE, cb(CreateRow)),
            (AFTER_CREATE, cb(LifecycleStep::AfterCreate)),
            (AUDIT, cb(Audit)),
        ],
        Phase::Update => vec![
            (COMPILE_FILTER, cb(CompileFilter)),
            (INJECT_SCOPE, cb(InjectScope)),
            (EXCLUDE_DELETED, cb(ExcludeDeleted)),
            (STAMP_MODIFIER, cb(StampModifier)),
            (BEFORE_UPDATE, cb(LifecycleStep::BeforeUpdate)),
            (UPDATE, cb(UpdateRows)),
            (AUDIT, cb(Audit)),
        ],
        Phase::Delete => vec![
            (COMPILE_FILTER, cb(CompileFilter)),
            (INJECT_SCOPE, cb(InjectScope)),
            (EXCLUDE_DELETED, cb(ExcludeDeleted)),
            (BEFORE_DELETE, cb(LifecycleStep::BeforeDelete)),
            (STAMP_MODIFIER, cb(StampModifier)),
            (DELETE, cb(DeleteRows)),
            (AUDIT, cb(Audit)),
        ],
    }
}

/// Register every built-in callback. They carry no ordering constraints, so
/// registration order is execution order.
pub(crate) fn register_all(registry: &CallbackRegistry) {
    for phase in Phase::ALL {
        for (name, handler) in chain(phase) {
            if let Err(e) = registry.register(Processor::new(phase, name, handler)) {
                tracing::error!(%phase, callback = name, error = %e, "built-in callback rejected");
            }
        }
    }
}
