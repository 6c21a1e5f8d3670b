#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Callback pipeline around scoped CRUD operations.
//!
//! Every create, update, delete and query runs inside a transaction through an
//! ordered chain of named [`Callback`]s. The built-in chain compiles the client
//! filter, injects the principal's organization scope, stamps ownership and
//! runs the statement; applications hook in before or after any built-in by
//! name.
//!
//! ```ignore
//! let callbacks = CallbackRegistry::with_builtins();
//! callbacks.register(
//!     Processor::new(Phase::Create, "app:normalize_email", Arc::new(NormalizeEmail))
//!         .before("adminkit:create"),
//! )?;
//! let pipeline = Pipeline::builder(db, metadata, resolver).callbacks(callbacks).build();
//! let out = pipeline.query(&ctx, "user", &json!({"age": {"$gte": 18}}), Page::default()).await?;
//! ```

pub mod audit;
pub mod builtin;
pub mod callback;
pub mod config;
pub mod error;
pub mod jobs;
pub mod lifecycle;
pub mod pipeline;
pub mod registry;
pub mod scope;

pub use audit::{AuditEvent, AuditSink, TracingAuditSink};
pub use callback::{Callback, Phase, Processor, callback_fn};
pub use config::PipelineConfig;
pub use error::{PipelineError, RegistryError};
pub use jobs::{InMemoryJobLock, JobError, JobLock, JobMode, JobRunner};
pub use lifecycle::{AfterCreate, AfterFind, BeforeCreate, BeforeDelete, BeforeUpdate, LifecycleRegistry};
pub use pipeline::{Outcome, Pipeline, PipelineBuilder};
pub use registry::CallbackRegistry;
pub use scope::Scope;
