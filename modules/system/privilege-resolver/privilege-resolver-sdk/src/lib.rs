#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Privilege Resolver SDK
//!
//! This crate provides the public API for the `privilege_resolver` module:
//!
//! - [`PrivilegeResolverClient`] - Public API trait for consumers
//! - [`PrivilegeSource`] - Storage-side trait for assignments, roles and organizations
//! - [`Organization`], [`Role`], [`DataPrivilege`], [`RoleAssignment`] - Models
//! - [`PrivilegeResolverError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! let privileges = resolver.resolve(&ctx).await?;
//! let scope = privileges.read_scope("user");
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod source;

pub use adminkit_security::{DataRange, PrivilegesDesc};
pub use api::PrivilegeResolverClient;
pub use error::PrivilegeResolverError;
pub use models::{DataPrivilege, EntityOverride, Organization, Role, RoleAssignment};
pub use source::PrivilegeSource;
