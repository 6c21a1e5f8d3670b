use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access_scope::AccessScope;
use crate::constants::ALL_PERMISSIONS;

/// Breadth of an organization-scoped privilege.
///
/// Totally ordered: `Personal < Current < CurrentFollowing`. Combining two
/// grants on the same organization keeps the wider one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataRange {
    /// Only rows owned by the principal.
    #[default]
    Personal,
    /// Rows of the organization itself.
    Current,
    /// Rows of the organization and all of its descendants.
    CurrentFollowing,
}

impl DataRange {
    /// Monotonic combination of two grants.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Organization sets for one entity whose privileges were overridden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOrgScope {
    pub readable_org_ids: BTreeSet<Uuid>,
    pub writable_org_ids: BTreeSet<Uuid>,
}

/// Resolved summary of one principal's effective permissions and
/// organization scope for a given active organization.
///
/// Serialized as JSON when cached, so field names are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegesDesc {
    pub user_id: Uuid,
    pub permission_codes: BTreeSet<String>,
    pub readable_org_ids: BTreeSet<Uuid>,
    pub writable_org_ids: BTreeSet<Uuid>,
    pub active_org_id: Uuid,
    /// Root principal: every scoping step is skipped.
    #[serde(default)]
    pub bypass: bool,
    #[serde(default)]
    pub entity_scopes: BTreeMap<String, EntityOrgScope>,
}

impl PrivilegesDesc {
    /// Privileges of the root principal.
    #[must_use]
    pub fn root(user_id: Uuid, active_org_id: Uuid) -> Self {
        Self {
            user_id,
            permission_codes: BTreeSet::from([ALL_PERMISSIONS.to_owned()]),
            active_org_id,
            bypass: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn has_permission(&self, code: &str) -> bool {
        self.bypass
            || self.permission_codes.contains(ALL_PERMISSIONS)
            || self.permission_codes.contains(code)
    }

    /// Organizations readable for `entity`, honouring per-entity overrides.
    #[must_use]
    pub fn readable_orgs_for(&self, entity: &str) -> &BTreeSet<Uuid> {
        self.entity_scopes
            .get(entity)
            .map_or(&self.readable_org_ids, |s| &s.readable_org_ids)
    }

    /// Organizations writable for `entity`, honouring per-entity overrides.
    #[must_use]
    pub fn writable_orgs_for(&self, entity: &str) -> &BTreeSet<Uuid> {
        self.entity_scopes
            .get(entity)
            .map_or(&self.writable_org_ids, |s| &s.writable_org_ids)
    }

    /// Row scope for reading `entity`: `owner_org IN readable OR owner = user`.
    #[must_use]
    pub fn read_scope(&self, entity: &str) -> AccessScope {
        if self.bypass {
            return AccessScope::allow_all();
        }
        AccessScope::orgs_or_owner(self.readable_orgs_for(entity).iter().copied(), self.user_id)
    }

    /// Row scope for writing `entity`: `owner_org IN writable OR owner = user`.
    #[must_use]
    pub fn write_scope(&self, entity: &str) -> AccessScope {
        if self.bypass {
            return AccessScope::allow_all();
        }
        AccessScope::orgs_or_owner(self.writable_orgs_for(entity).iter().copied(), self.user_id)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_totally_ordered() {
        assert!(DataRange::Personal < DataRange::Current);
        assert!(DataRange::Current < DataRange::CurrentFollowing);
        assert_eq!(
            DataRange::Current.combine(DataRange::Personal),
            DataRange::Current
        );
    }

    #[test]
    fn range_serde_uses_screaming_case() {
        let s = serde_json::to_string(&DataRange::CurrentFollowing).unwrap();
        assert_eq!(s, "\"CURRENT_FOLLOWING\"");
        let r: DataRange = serde_json::from_str("\"PERSONAL\"").unwrap();
        assert_eq!(r, DataRange::Personal);
    }

    #[test]
    fn entity_override_takes_precedence() {
        let user = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let desc = PrivilegesDesc {
            user_id: user,
            readable_org_ids: BTreeSet::from([a, b]),
            entity_scopes: BTreeMap::from([(
                "invoice".to_owned(),
                EntityOrgScope {
                    readable_org_ids: BTreeSet::from([a]),
                    writable_org_ids: BTreeSet::new(),
                },
            )]),
            ..PrivilegesDesc::default()
        };

        let scope = desc.read_scope("invoice");
        assert_eq!(scope.orgs(), Some(&BTreeSet::from([a])));
        assert_eq!(scope.owner(), Some(user));

        let other = desc.read_scope("customer");
        assert_eq!(other.orgs(), Some(&BTreeSet::from([a, b])));
    }

    #[test]
    fn root_bypasses_scope_and_permissions() {
        let desc = PrivilegesDesc::root(Uuid::new_v4(), Uuid::new_v4());
        assert!(desc.read_scope("anything").is_unconstrained());
        assert!(desc.write_scope("anything").is_unconstrained());
        assert!(desc.has_permission("user:delete"));
    }
}
