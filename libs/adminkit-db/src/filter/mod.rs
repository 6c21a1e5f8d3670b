//! Predicate Compiler.
//!
//! Translates client-supplied JSON filters into backend-neutral [`Predicate`]
//! trees. The grammar:
//!
//! | Input | Predicate |
//! |-------|-----------|
//! | `{"f": 1}` | `f = ?` |
//! | `{"f": null}` | `f IS NULL` |
//! | `{"f": {"$in": [..]}}` / `$nin` | `f [NOT] IN (?, ..)` |
//! | `{"f": {"$eq": x}}` / `$ne` | `f = ?` / `f <> ?` (`null` → `IS [NOT] NULL`) |
//! | `{"f": {"$exists": true}}` | `f IS NOT NULL` |
//! | `{"f": {"$regex": "^ab"}}` | `f LIKE 'ab%'` |
//! | `{"f": {"$gte": a, "$lt": b}}` | one two-sided bound |
//! | `{"rel": {..}}` | `key IN (SELECT ..)` against the related entity |
//! | `{"$and": [..]}` / `{"$or": [..]}` | flattened conjunction / OR group |
//!
//! Unknown fields and operators are dropped and logged at `debug`.

mod compiler;
mod predicate;

use serde_json::Value;
use thiserror::Error;

pub use compiler::{compile, compile_str};
pub use predicate::{Bound, ColumnRef, CompareOp, Predicate, SubQuery};

/// Default nesting limit of `$and`/`$or` and relationship traversal.
pub const DEFAULT_MAX_DEPTH: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The filter is malformed; surfaced to clients as a bad request.
    #[error("filter compilation failed: {0}")]
    CompilationFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Result of compiling a filter: an AND-list of fragments plus the top-level
/// OR groups, which are kept apart so appended fragments compose by AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    pub(crate) fragments: Vec<Predicate>,
    pub(crate) or_groups: Vec<Predicate>,
}

impl CompiledFilter {
    #[must_use]
    pub fn fragments(&self) -> &[Predicate] {
        &self.fragments
    }

    #[must_use]
    pub fn or_groups(&self) -> &[Predicate] {
        &self.or_groups
    }

    /// AND another fragment onto the filter.
    pub fn push_fragment(&mut self, fragment: Predicate) {
        self.fragments.push(fragment);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.or_groups.is_empty()
    }

    /// The whole filter as a single predicate.
    #[must_use]
    pub fn predicate(&self) -> Predicate {
        let mut all = self.fragments.clone();
        all.extend(self.or_groups.iter().cloned());
        Predicate::and(all)
    }

    /// Every fragment and OR group rendered separately with its own parameters.
    #[must_use]
    pub fn fragments_with_params(&self) -> Vec<(String, Vec<Value>)> {
        self.fragments
            .iter()
            .chain(&self.or_groups)
            .map(Predicate::to_sql)
            .collect()
    }

    /// The whole filter as SQL text with `?` placeholders. Empty when the
    /// filter has no conditions.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.fragments_with_params()
            .into_iter()
            .map(|(sql, _)| sql)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Parameters of [`CompiledFilter::to_sql`], in placeholder order.
    #[must_use]
    pub fn params(&self) -> Vec<Value> {
        self.fragments_with_params()
            .into_iter()
            .flat_map(|(_, params)| params)
            .collect()
    }
}
