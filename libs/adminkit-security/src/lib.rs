#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod access_scope;
pub mod constants;
pub mod context;
pub mod privileges;

pub use access_scope::{AccessPath, AccessScope};
pub use context::SecurityContext;
pub use privileges::{DataRange, EntityOrgScope, PrivilegesDesc};
