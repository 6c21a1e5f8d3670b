//! Domain service for the privilege resolver.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use adminkit_security::{DataRange, EntityOrgScope, PrivilegesDesc, SecurityContext};
use privilege_resolver_sdk::{PrivilegeSource, Role};
use tracing::{debug, warn};
use uuid::Uuid;

use super::cache::{
    CachedPrivileges, PrivilegeCache, add_role_set, join_role_ids, privileges_key, role_sets,
    role_sets_key, roles_key, user_prefix,
};
use super::error::DomainError;
use super::org_index::OrgIndex;
use crate::config::PrivilegeResolverConfig;

#[derive(Debug, Default, Clone, Copy)]
struct Grant {
    readable: DataRange,
    writable: DataRange,
}

#[derive(Debug, Default, Clone, Copy)]
struct OverrideGrant {
    readable: Option<DataRange>,
    writable: Option<DataRange>,
}

/// Roles folded together: ranges keep their maximum per organization, and
/// per entity and organization for overrides.
#[derive(Debug, Default)]
struct Folded {
    permissions: BTreeSet<String>,
    grants: BTreeMap<Uuid, Grant>,
    overrides: BTreeMap<String, BTreeMap<Uuid, OverrideGrant>>,
}

fn fold_roles(roles: &[Role]) -> Folded {
    let mut folded = Folded::default();
    for role in roles {
        folded
            .permissions
            .extend(role.operation_permissions.iter().cloned());
        for dp in &role.data_privileges {
            let grant = folded.grants.entry(dp.organization_id).or_default();
            grant.readable = grant.readable.combine(dp.readable_range);
            grant.writable = grant.writable.combine(dp.writable_range);

            for ov in &dp.per_entity_overrides {
                let slot = folded
                    .overrides
                    .entry(ov.entity_name.clone())
                    .or_default()
                    .entry(dp.organization_id)
                    .or_default();
                // `None < Some(_)`, so an unset override never wins over a set one.
                slot.readable = slot.readable.max(ov.readable_range);
                slot.writable = slot.writable.max(ov.writable_range);
            }
        }
    }
    folded
}

fn expand_all(
    index: &OrgIndex,
    ranges: impl IntoIterator<Item = (Uuid, DataRange)>,
) -> Result<BTreeSet<Uuid>, DomainError> {
    let mut out = BTreeSet::new();
    for (org, range) in ranges {
        out.extend(index.expand(org, range)?);
    }
    Ok(out)
}

/// Role ids of a user's active assignments.
#[derive(Debug)]
struct ActiveRoles {
    ids: Vec<Uuid>,
    /// Earliest expiry among the active assignments.
    valid_until: Option<i64>,
}

/// Privilege resolver service.
pub struct Service {
    source: Arc<dyn PrivilegeSource>,
    cache: Option<Arc<dyn PrivilegeCache>>,
    root_user_id: Uuid,
}

impl Service {
    #[must_use]
    pub fn new(
        source: Arc<dyn PrivilegeSource>,
        cache: Option<Arc<dyn PrivilegeCache>>,
        cfg: &PrivilegeResolverConfig,
    ) -> Self {
        Self {
            source,
            cache: if cfg.cache_enabled { cache } else { None },
            root_user_id: cfg.root_user_id,
        }
    }

    /// Resolve the privileges of the context's principal in its active
    /// organization.
    ///
    /// # Errors
    /// - [`DomainError::NoAssignments`] if no assignment is active
    /// - [`DomainError::UnknownOrganization`], [`DomainError::DanglingParent`],
    ///   [`DomainError::ParentCycle`], [`DomainError::Source`] if the
    ///   organization tree cannot be used
    #[tracing::instrument(
        skip_all,
        fields(user_id = %ctx.principal_id(), org_id = %ctx.active_org_id())
    )]
    pub async fn resolve(&self, ctx: &SecurityContext) -> Result<PrivilegesDesc, DomainError> {
        let user_id = ctx.principal_id();
        let org_id = ctx.active_org_id();

        if user_id == self.root_user_id {
            debug!("root principal, bypassing resolution");
            return Ok(PrivilegesDesc::root(user_id, org_id));
        }

        if let Some(cache) = &self.cache
            && let Some(hit) = Self::cached(cache.as_ref(), user_id, org_id).await?
        {
            debug!("privileges served from cache");
            return Ok(hit);
        }

        let active = self.active_roles(user_id).await?;
        let privileges = self.compute(user_id, org_id, &active.ids).await?;

        if let Some(cache) = &self.cache {
            let joined = join_role_ids(&active.ids);
            let entry = CachedPrivileges {
                privileges: privileges.clone(),
                valid_until: active.valid_until,
            };
            cache
                .set(
                    &privileges_key(&joined, user_id, org_id),
                    serde_json::to_string(&entry)?,
                )
                .await?;
            let sets_key = role_sets_key(user_id);
            let index = cache.get(&sets_key).await?;
            cache
                .set(&sets_key, add_role_set(index.as_deref(), &joined))
                .await?;
            cache.set(&roles_key(user_id), joined).await?;
        }
        Ok(privileges)
    }

    /// Drop cached privileges of `user_id`.
    ///
    /// # Errors
    /// Cache backend failure.
    #[tracing::instrument(skip(self))]
    pub async fn invalidate(&self, user_id: Uuid) -> Result<(), DomainError> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let sets_key = role_sets_key(user_id);
        if let Some(index) = cache.get(&sets_key).await? {
            for joined in role_sets(&index) {
                cache.delete_prefix(&user_prefix(joined, user_id)).await?;
            }
        }
        cache.delete(&sets_key).await?;
        cache.delete(&roles_key(user_id)).await?;
        debug!("cached privileges invalidated");
        Ok(())
    }

    async fn cached(
        cache: &dyn PrivilegeCache,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<PrivilegesDesc>, DomainError> {
        let Some(joined) = cache.get(&roles_key(user_id)).await? else {
            return Ok(None);
        };
        let Some(raw) = cache.get(&privileges_key(&joined, user_id, org_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<CachedPrivileges>(&raw) {
            Ok(entry) if entry.is_fresh_at(chrono::Utc::now().timestamp()) => {
                Ok(Some(entry.privileges))
            }
            Ok(_) => {
                debug!("cached privileges outlived an assignment; recomputing");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable cached privileges");
                Ok(None)
            }
        }
    }

    async fn active_roles(&self, user_id: Uuid) -> Result<ActiveRoles, DomainError> {
        let now = chrono::Utc::now().timestamp();
        let active: Vec<_> = self
            .source
            .assignments(user_id)
            .await?
            .into_iter()
            .filter(|a| a.is_active_at(now))
            .collect();
        if active.is_empty() {
            return Err(DomainError::NoAssignments { user_id });
        }
        let valid_until = active
            .iter()
            .map(|a| a.expires_at)
            .filter(|&at| at != 0)
            .min();
        let mut ids: Vec<Uuid> = active.into_iter().map(|a| a.role_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ActiveRoles { ids, valid_until })
    }

    async fn compute(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        role_ids: &[Uuid],
    ) -> Result<PrivilegesDesc, DomainError> {
        let roles = self.source.roles(role_ids).await?;
        let folded = fold_roles(&roles);
        let index = OrgIndex::build(self.source.organizations().await?)?;

        let readable_org_ids =
            expand_all(&index, folded.grants.iter().map(|(org, g)| (*org, g.readable)))?;
        let writable_org_ids =
            expand_all(&index, folded.grants.iter().map(|(org, g)| (*org, g.writable)))?;

        let mut entity_scopes = BTreeMap::new();
        for (entity, per_org) in &folded.overrides {
            let effective = |org: &Uuid, g: &Grant| {
                let ov = per_org.get(org).copied().unwrap_or_default();
                (
                    ov.readable.unwrap_or(g.readable),
                    ov.writable.unwrap_or(g.writable),
                )
            };
            let scope = EntityOrgScope {
                readable_org_ids: expand_all(
                    &index,
                    folded.grants.iter().map(|(org, g)| (*org, effective(org, g).0)),
                )?,
                writable_org_ids: expand_all(
                    &index,
                    folded.grants.iter().map(|(org, g)| (*org, effective(org, g).1)),
                )?,
            };
            entity_scopes.insert(entity.clone(), scope);
        }

        debug!(
            roles = roles.len(),
            readable = readable_org_ids.len(),
            writable = writable_org_ids.len(),
            "privileges resolved"
        );
        Ok(PrivilegesDesc {
            user_id,
            permission_codes: folded.permissions,
            readable_org_ids,
            writable_org_ids,
            active_org_id: org_id,
            bypass: false,
            entity_scopes,
        })
    }
}
