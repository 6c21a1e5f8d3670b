//! Domain layer of the privilege resolver.

pub mod cache;
pub mod error;
pub mod local_client;
pub mod org_index;
pub mod service;
pub mod static_source;

pub use cache::{InMemoryPrivilegeCache, PrivilegeCache};
pub use error::DomainError;
pub use local_client::PrivilegeResolverLocalClient;
pub use org_index::OrgIndex;
pub use service::Service;
pub use static_source::StaticPrivilegeSource;
