//! Cache of resolved privileges.
//!
//! Entries are JSON strings so any shared key-value backend can hold them:
//!
//! | Key | Value |
//! |-----|-------|
//! | `privileges_<roleIds>_<userId>_<orgId>` | serialized [`CachedPrivileges`] |
//! | `privileges_roles_<userId>` | sorted role ids joined by `,` |
//! | `privileges_sets_<userId>` | every role set cached for the user, joined by `;` |
//!
//! The role pointer is the only way into the privileges entries, so entries of
//! a role set the user no longer holds are never read again. The role-set
//! index lets invalidation remove them anyway.

use adminkit_security::PrivilegesDesc;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;

const KEY_PREFIX: &str = "privileges_";

/// Sorted, deduplicated role ids joined by `,`.
#[must_use]
pub fn join_role_ids(role_ids: &[Uuid]) -> String {
    let mut ids = role_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",")
}

#[must_use]
pub fn privileges_key(joined_role_ids: &str, user_id: Uuid, org_id: Uuid) -> String {
    format!("{KEY_PREFIX}{joined_role_ids}_{user_id}_{org_id}")
}

/// Prefix shared by every privileges entry of `user_id` for one role set.
#[must_use]
pub fn user_prefix(joined_role_ids: &str, user_id: Uuid) -> String {
    format!("{KEY_PREFIX}{joined_role_ids}_{user_id}_")
}

#[must_use]
pub fn roles_key(user_id: Uuid) -> String {
    format!("{KEY_PREFIX}roles_{user_id}")
}

#[must_use]
pub fn role_sets_key(user_id: Uuid) -> String {
    format!("{KEY_PREFIX}sets_{user_id}")
}

/// Add `joined_role_ids` to a role-set index value, keeping it unique.
#[must_use]
pub fn add_role_set(index: Option<&str>, joined_role_ids: &str) -> String {
    let mut sets: Vec<&str> = index
        .unwrap_or_default()
        .split(';')
        .filter(|s| !s.is_empty())
        .collect();
    if !sets.contains(&joined_role_ids) {
        sets.push(joined_role_ids);
    }
    sets.join(";")
}

/// Role sets recorded in a role-set index value.
pub fn role_sets(index: &str) -> impl Iterator<Item = &str> {
    index.split(';').filter(|s| !s.is_empty())
}

/// A cached privileges entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPrivileges {
    pub privileges: PrivilegesDesc,
    /// Earliest expiry (unix seconds) among the assignments the entry was
    /// computed from; `None` when none of them expires.
    #[serde(default)]
    pub valid_until: Option<i64>,
}

impl CachedPrivileges {
    #[must_use]
    pub fn is_fresh_at(&self, now_unix: i64) -> bool {
        self.valid_until.is_none_or(|until| now_unix < until)
    }
}

/// String key-value store backing the resolver cache.
#[async_trait]
pub trait PrivilegeCache: Send + Sync {
    /// # Errors
    /// Backend failure.
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// # Errors
    /// Backend failure.
    async fn set(&self, key: &str, value: String) -> Result<(), DomainError>;

    /// # Errors
    /// Backend failure.
    async fn delete(&self, key: &str) -> Result<(), DomainError>;

    /// Delete every key starting with `prefix`.
    ///
    /// # Errors
    /// Backend failure.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), DomainError>;
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct InMemoryPrivilegeCache {
    entries: DashMap<String, String>,
}

impl InMemoryPrivilegeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PrivilegeCache for InMemoryPrivilegeCache {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), DomainError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), DomainError> {
        self.entries.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}
