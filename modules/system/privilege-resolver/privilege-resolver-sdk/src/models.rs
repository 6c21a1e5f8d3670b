//! Models of the privilege resolver: the organization tree, roles with their
//! data privileges, and role assignments.

use adminkit_security::DataRange;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node of the organization tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Materialized path `/<root>/../<self>/`. Recomputed whenever the tree is
    /// loaded; the stored value is never trusted.
    #[serde(default)]
    pub full_path: String,
}

impl Organization {
    #[must_use]
    pub fn new(id: Uuid, code: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        let code = code.into();
        Self {
            id,
            name: code.clone(),
            code,
            parent_id,
            full_path: String::new(),
        }
    }

    /// Whether `self` is `ancestor` or lies below it. Both paths must be
    /// computed.
    #[must_use]
    pub fn is_within(&self, ancestor: &Organization) -> bool {
        !ancestor.full_path.is_empty() && self.full_path.starts_with(&ancestor.full_path)
    }
}

/// Range override for one entity inside a [`DataPrivilege`]. An unset range
/// leaves the organization-level range in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOverride {
    pub entity_name: String,
    #[serde(default)]
    pub readable_range: Option<DataRange>,
    #[serde(default)]
    pub writable_range: Option<DataRange>,
}

/// What a role may see and modify within one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPrivilege {
    pub organization_id: Uuid,
    #[serde(default)]
    pub readable_range: DataRange,
    #[serde(default)]
    pub writable_range: DataRange,
    #[serde(default)]
    pub per_entity_overrides: Vec<EntityOverride>,
}

impl DataPrivilege {
    #[must_use]
    pub fn new(organization_id: Uuid, readable: DataRange, writable: DataRange) -> Self {
        Self {
            organization_id,
            readable_range: readable,
            writable_range: writable,
            per_entity_overrides: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_override(mut self, ov: EntityOverride) -> Self {
        self.per_entity_overrides.push(ov);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub operation_permissions: Vec<String>,
    #[serde(default)]
    pub data_privileges: Vec<DataPrivilege>,
}

/// Grants `role_id` to `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role_id: Uuid,
    /// Unix seconds; `0` never expires.
    #[serde(default)]
    pub expires_at: i64,
}

impl RoleAssignment {
    #[must_use]
    pub fn new(user_id: Uuid, role_id: Uuid) -> Self {
        Self {
            user_id,
            role_id,
            expires_at: 0,
        }
    }

    #[must_use]
    pub fn is_active_at(&self, now_unix: i64) -> bool {
        self.expires_at == 0 || self.expires_at > now_unix
    }
}
