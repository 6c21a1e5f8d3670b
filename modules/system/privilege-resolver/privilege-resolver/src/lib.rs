//! Privilege Resolver Module
//!
//! Resolves a principal's effective data privileges from role assignments and
//! the organization tree, caching results per role set.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod module;

pub use module::PrivilegeResolverModule;
