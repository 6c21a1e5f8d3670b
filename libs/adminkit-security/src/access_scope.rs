//! Row-level reach of one principal over one entity.
//!
//! A scope is either unconstrained (root principal, unrestricted entities)
//! or an OR of at most two [`AccessPath`]s: rows owned by one of a set of
//! organizations, and rows owned by the principal itself. The data-access
//! layer maps each path onto the entity's tagged columns.

use std::collections::BTreeSet;

use uuid::Uuid;

/// One alternative way a row can be reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessPath {
    /// `owner_org IN orgs`.
    Orgs(BTreeSet<Uuid>),
    /// `owner = principal`.
    Owner(Uuid),
}

impl AccessPath {
    /// Whether a row whose path column holds `id` is reached through this path.
    #[must_use]
    pub fn admits(&self, id: Uuid) -> bool {
        match self {
            Self::Orgs(orgs) => orgs.contains(&id),
            Self::Owner(owner) => *owner == id,
        }
    }
}

/// The rows a principal may reach, as OR-ed access paths.
///
/// # Examples
///
/// ```
/// use adminkit_security::AccessScope;
/// use uuid::Uuid;
///
/// assert!(AccessScope::deny_all().is_deny_all());
///
/// let org = Uuid::new_v4();
/// let me = Uuid::new_v4();
/// let scope = AccessScope::orgs_or_owner([org], me);
/// assert!(scope.orgs().is_some_and(|o| o.contains(&org)));
/// assert_eq!(scope.owner(), Some(me));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessScope {
    paths: Vec<AccessPath>,
    unconstrained: bool,
}

impl Default for AccessScope {
    /// Deny-all.
    fn default() -> Self {
        Self::deny_all()
    }
}

impl AccessScope {
    /// Every row. Used for the root principal and unrestricted entities.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            paths: Vec::new(),
            unconstrained: true,
        }
    }

    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            paths: Vec::new(),
            unconstrained: false,
        }
    }

    /// `owner_org IN orgs OR owner = owner`.
    ///
    /// The organization path is omitted when `orgs` is empty, leaving only the
    /// ownership path (a PERSONAL-only principal).
    #[must_use]
    pub fn orgs_or_owner(orgs: impl IntoIterator<Item = Uuid>, owner: Uuid) -> Self {
        let orgs: BTreeSet<Uuid> = orgs.into_iter().collect();
        let mut paths = Vec::with_capacity(2);
        if !orgs.is_empty() {
            paths.push(AccessPath::Orgs(orgs));
        }
        paths.push(AccessPath::Owner(owner));
        Self {
            paths,
            unconstrained: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn paths(&self) -> &[AccessPath] {
        &self.paths
    }

    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.unconstrained
    }

    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        !self.unconstrained && self.paths.is_empty()
    }

    /// Organizations of the organization path, if present.
    #[must_use]
    pub fn orgs(&self) -> Option<&BTreeSet<Uuid>> {
        self.paths.iter().find_map(|p| match p {
            AccessPath::Orgs(orgs) => Some(orgs),
            AccessPath::Owner(_) => None,
        })
    }

    /// Principal of the ownership path, if present.
    #[must_use]
    pub fn owner(&self) -> Option<Uuid> {
        self.paths.iter().find_map(|p| match p {
            AccessPath::Owner(owner) => Some(*owner),
            AccessPath::Orgs(_) => None,
        })
    }
}
