#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Authorization-aware data access for AdminKit.
//!
//! - [`metadata`]: durable entity descriptions (fields, storage names,
//!   relationships, semantic tags) shared by every other component.
//! - [`filter`]: compiles client JSON filters into backend-neutral
//!   [`Predicate`](filter::Predicate) trees with ordered parameter lists.
//! - [`scope`]: lowers an [`AccessScope`](adminkit_security::AccessScope)
//!   into a predicate using entity field tags.
//! - [`cond`] and [`store`]: lower predicates into `SeaORM` conditions and run
//!   them against a relational connection.

pub mod cond;
pub mod config;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod scope;
pub mod store;

pub use config::{ConnectOpts, DatabaseConfig};
pub use error::DbError;
pub use filter::{CompileError, CompileOptions, CompiledFilter, Predicate};
pub use metadata::{
    DescribeEntity, EntityDescriptor, EntityMeta, FieldDescriptor, FieldTag, MetadataError,
    MetadataRegistry, Relation, RelationKind,
};
pub use store::{Db, Page, Record};
