//! Materialized-path index over the organization tree.
//!
//! Every organization gets the path `/<root>/../<self>/`. Descendants of an
//! organization are exactly the paths that start with its own, found by a
//! range scan over the ordered path map. Including the organization itself and
//! the trailing delimiter keeps siblings whose ids share a prefix apart.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::ops::Bound;

use adminkit_security::DataRange;
use privilege_resolver_sdk::Organization;
use uuid::Uuid;

use super::DomainError;

#[derive(Debug, Clone, Default)]
pub struct OrgIndex {
    orgs: BTreeMap<Uuid, Organization>,
    by_path: BTreeMap<String, Uuid>,
}

impl OrgIndex {
    /// Build the index, recomputing every `full_path`.
    ///
    /// # Errors
    /// [`DomainError::DanglingParent`] if a parent is missing,
    /// [`DomainError::ParentCycle`] if the parent links loop.
    pub fn build(orgs: Vec<Organization>) -> Result<Self, DomainError> {
        let parents: BTreeMap<Uuid, Option<Uuid>> =
            orgs.iter().map(|o| (o.id, o.parent_id)).collect();

        let mut index = Self::default();
        for mut org in orgs {
            let path = materialize_path(org.id, &parents)?;
            index.by_path.insert(path.clone(), org.id);
            org.full_path = path;
            index.orgs.insert(org.id, org);
        }
        tracing::debug!(organizations = index.orgs.len(), "organization index built");
        Ok(index)
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Organization> {
        self.orgs.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orgs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty()
    }

    /// `id` and every organization below it.
    ///
    /// # Errors
    /// [`DomainError::UnknownOrganization`] if `id` is not indexed.
    pub fn subtree(&self, id: Uuid) -> Result<impl Iterator<Item = Uuid> + '_, DomainError> {
        let prefix = self
            .orgs
            .get(&id)
            .map(|o| o.full_path.as_str())
            .ok_or(DomainError::UnknownOrganization(id))?;
        Ok(self
            .by_path
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(path, _)| path.starts_with(prefix))
            .map(|(_, id)| *id))
    }

    /// Organizations covered by `range` anchored at `id`.
    ///
    /// # Errors
    /// [`DomainError::UnknownOrganization`] if `id` is not indexed, whatever
    /// the range.
    pub fn expand(&self, id: Uuid, range: DataRange) -> Result<BTreeSet<Uuid>, DomainError> {
        if !self.orgs.contains_key(&id) {
            return Err(DomainError::UnknownOrganization(id));
        }
        Ok(match range {
            DataRange::Personal => BTreeSet::new(),
            DataRange::Current => BTreeSet::from([id]),
            DataRange::CurrentFollowing => self.subtree(id)?.collect(),
        })
    }
}

fn materialize_path(id: Uuid, parents: &BTreeMap<Uuid, Option<Uuid>>) -> Result<String, DomainError> {
    let mut chain = vec![id];
    let mut current = id;
    while let Some(parent) = parents.get(&current).copied().flatten() {
        if !parents.contains_key(&parent) {
            return Err(DomainError::DanglingParent {
                org: current,
                parent,
            });
        }
        if chain.contains(&parent) {
            return Err(DomainError::ParentCycle(parent));
        }
        chain.push(parent);
        current = parent;
    }

    let mut path = String::from("/");
    for node in chain.iter().rev() {
        _ = write!(path, "{node}/");
    }
    Ok(path)
}
