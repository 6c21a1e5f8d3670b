//! Lowering of [`AccessScope`] into predicates over an entity.
//!
//! Each access path resolves to a column through field tags:
//!
//! | Path | Field |
//! |------|-------|
//! | [`AccessPath::Orgs`] | tagged `owner_org` |
//! | [`AccessPath::Owner`] | tagged `owner` |
//!
//! Paths are OR-ed. A path whose field the entity lacks is dropped; when no
//! path resolves, the scope denies everything.
//!
//! # Id columns
//!
//! Organization and principal ids are stored and bound as canonical
//! hyphenated lowercase text (`Uuid::to_string`), never as a native `uuid`
//! type. Ownership columns must therefore be `TEXT`/`VARCHAR(36)` on every
//! backend, which is also what the stamping callbacks write.

use adminkit_security::{AccessPath, AccessScope};
use serde_json::Value;
use uuid::Uuid;

use crate::filter::{ColumnRef, CompareOp, Predicate};
use crate::metadata::{EntityMeta, FieldMeta, FieldTag};
use crate::store::Record;

fn stored_tagged(meta: &EntityMeta, tag: FieldTag) -> Option<&FieldMeta> {
    meta.tagged(tag).filter(|f| f.is_stored())
}

/// The stored field holding the owning organization, if any.
#[must_use]
pub fn owner_org_field(meta: &EntityMeta) -> Option<&FieldMeta> {
    stored_tagged(meta, FieldTag::OwnerOrg)
}

/// The stored field holding the owning principal, if any.
#[must_use]
pub fn owner_field(meta: &EntityMeta) -> Option<&FieldMeta> {
    stored_tagged(meta, FieldTag::Owner)
}

fn path_field<'m>(meta: &'m EntityMeta, path: &AccessPath) -> Option<&'m FieldMeta> {
    match path {
        AccessPath::Orgs(_) => owner_org_field(meta),
        AccessPath::Owner(_) => owner_field(meta),
    }
}

/// The bound form of an id.
#[must_use]
pub fn id_value(id: Uuid) -> Value {
    Value::String(id.to_string())
}

/// Build the row predicate for `scope` over `meta`, qualified by `alias`.
///
/// | Scope | Predicate |
/// |-------|-----------|
/// | unrestricted entity or unconstrained scope | `Const(true)` |
/// | deny-all, or no path resolves | `Const(false)` |
/// | otherwise | OR of the resolved paths |
#[must_use]
pub fn scope_predicate(meta: &EntityMeta, scope: &AccessScope, alias: &str) -> Predicate {
    if meta.is_unrestricted() || scope.is_unconstrained() {
        return Predicate::Const(true);
    }

    let compiled: Vec<Predicate> = scope
        .paths()
        .iter()
        .filter_map(|p| path_predicate(meta, p, alias))
        .collect();

    if compiled.is_empty() {
        tracing::debug!(entity = meta.name(), "no access path resolved; denying");
        return Predicate::Const(false);
    }
    Predicate::or(compiled)
}

fn path_predicate(meta: &EntityMeta, path: &AccessPath, alias: &str) -> Option<Predicate> {
    let field = path_field(meta, path)?;
    let column = ColumnRef::new(alias, &field.column);
    Some(match path {
        AccessPath::Orgs(orgs) if orgs.is_empty() => Predicate::Const(false),
        AccessPath::Orgs(orgs) => Predicate::In {
            column,
            values: orgs.iter().copied().map(id_value).collect(),
            negated: false,
        },
        AccessPath::Owner(owner) => Predicate::Compare {
            column,
            op: CompareOp::Eq,
            value: id_value(*owner),
        },
    })
}

/// Check an in-memory record against `scope`.
///
/// The write-time counterpart of [`scope_predicate`]: some path must resolve
/// to a field whose value in `record` is an id the path admits. Absent or
/// unparseable values fail the path.
#[must_use]
pub fn record_in_scope(meta: &EntityMeta, scope: &AccessScope, record: &Record) -> bool {
    if meta.is_unrestricted() || scope.is_unconstrained() {
        return true;
    }
    scope.paths().iter().any(|path| {
        path_field(meta, path)
            .and_then(|f| record.get(&f.name))
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .is_some_and(|id| path.admits(id))
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::metadata::{EntityDescriptor, FieldDescriptor};
    use serde_json::json;

    const ORG: &str = "11111111-1111-1111-1111-111111111111";
    const USER: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";

    fn meta() -> EntityMeta {
        EntityMeta::from_descriptor(
            EntityDescriptor::new("doc")
                .table("docs")
                .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
                .field(FieldDescriptor::new("org_id").tag(FieldTag::OwnerOrg))
                .field(FieldDescriptor::new("created_by").tag(FieldTag::Owner)),
        )
        .unwrap()
    }

    fn uid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn orgs_or_owner_lowers_to_or_of_two_paths() {
        let scope = AccessScope::orgs_or_owner([uid(ORG)], uid(USER));
        let (sql, params) = scope_predicate(&meta(), &scope, "docs").to_sql();
        assert_eq!(sql, "(docs.org_id IN (?) OR docs.created_by = ?)");
        assert_eq!(params, vec![json!(ORG), json!(USER)]);
    }

    #[test]
    fn ids_bind_as_lowercase_hyphenated_text() {
        let upper = Uuid::parse_str("AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA").unwrap();
        let scope = AccessScope::orgs_or_owner([], upper);
        let (_, params) = scope_predicate(&meta(), &scope, "docs").to_sql();
        assert_eq!(params, vec![Value::String(USER.to_owned())]);
        assert!(matches!(
            crate::cond::json_to_sea_value(&params[0]),
            sea_orm::Value::String(Some(_))
        ));
    }

    #[test]
    fn missing_owner_column_drops_that_path() {
        let meta = EntityMeta::from_descriptor(
            EntityDescriptor::new("note")
                .table("notes")
                .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
                .field(FieldDescriptor::new("org_id").tag(FieldTag::OwnerOrg)),
        )
        .unwrap();

        let scope = AccessScope::orgs_or_owner([uid(ORG)], uid(USER));
        let (sql, _) = scope_predicate(&meta, &scope, "notes").to_sql();
        assert_eq!(sql, "notes.org_id IN (?)");

        let personal = AccessScope::orgs_or_owner([], uid(USER));
        assert_eq!(
            scope_predicate(&meta, &personal, "notes"),
            Predicate::Const(false)
        );
    }

    #[test]
    fn deny_all_and_allow_all() {
        assert_eq!(
            scope_predicate(&meta(), &AccessScope::deny_all(), "docs"),
            Predicate::Const(false)
        );
        assert_eq!(
            scope_predicate(&meta(), &AccessScope::allow_all(), "docs"),
            Predicate::Const(true)
        );
    }

    #[test]
    fn record_check_matches_any_path() {
        let scope = AccessScope::orgs_or_owner([uid(ORG)], uid(USER));
        let mut rec = Record::new();
        rec.insert("org_id".to_owned(), json!(Uuid::new_v4().to_string()));
        rec.insert("created_by".to_owned(), json!(USER));
        assert!(record_in_scope(&meta(), &scope, &rec));

        rec.insert("created_by".to_owned(), json!(Uuid::new_v4().to_string()));
        assert!(!record_in_scope(&meta(), &scope, &rec));

        rec.insert("org_id".to_owned(), json!(ORG));
        assert!(record_in_scope(&meta(), &scope, &rec));

        rec.remove("org_id");
        assert!(!record_in_scope(&meta(), &scope, &rec));
    }
}
