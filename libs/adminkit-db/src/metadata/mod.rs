//! Entity Metadata Registry.
//!
//! Entities are described once, either by a Rust type implementing
//! [`DescribeEntity`] or by a declarative [`EntityDescriptor`] loaded from
//! configuration. The registry turns descriptors into indexed [`EntityMeta`]
//! values that the filter compiler, the scope lowering and the pipeline share.
//!
//! The registry is populated at startup and read-only afterwards.

mod descriptor;
mod error;
mod registry;

pub use descriptor::{
    DescribeEntity, EntityDescriptor, FieldDescriptor, FieldTag, JoinTable, Relation,
    RelationKind,
};
pub use error::MetadataError;
pub use registry::{EntityMeta, FieldMeta, MetadataRegistry};
