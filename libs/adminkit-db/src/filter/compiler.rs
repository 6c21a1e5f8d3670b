use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::debug;

use super::predicate::{Bound, ColumnRef, CompareOp, Predicate, SubQuery};
use super::{CompileError, CompileOptions, CompiledFilter};
use crate::metadata::{EntityMeta, FieldMeta, MetadataRegistry, Relation, RelationKind};

/// Compile a JSON filter against `meta`.
///
/// Top-level `$or` groups are kept apart from the AND-list in the result so
/// scope predicates appended later compose with them by AND.
///
/// # Errors
/// Returns [`CompileError::CompilationFailed`] if the filter is not a JSON
/// object or nests deeper than [`CompileOptions::max_depth`]. Unknown fields
/// and operators are dropped, not rejected.
pub fn compile(
    filter: &Value,
    meta: &EntityMeta,
    registry: &MetadataRegistry,
    opts: CompileOptions,
) -> Result<CompiledFilter, CompileError> {
    let result = match filter {
        Value::Object(obj) => {
            let mut compiler = Compiler {
                registry,
                max_depth: opts.max_depth,
                alias_seq: 0,
            };
            compiler
                .object(obj, meta, meta.table(), 0)
                .map(|parts| CompiledFilter {
                    fragments: parts.and,
                    or_groups: parts.or_groups,
                })
        }
        Value::Null => Ok(CompiledFilter::default()),
        _ => Err(CompileError::CompilationFailed(
            "filter must be a JSON object".to_owned(),
        )),
    };
    if let Err(err) = &result {
        tracing::warn!(entity = meta.name(), error = %err, "filter rejected");
    }
    result
}

/// Parse and compile a JSON filter string. Blank input compiles to an empty
/// filter.
///
/// # Errors
/// Returns [`CompileError::CompilationFailed`] on malformed JSON, or any error
/// from [`compile`].
pub fn compile_str(
    filter: &str,
    meta: &EntityMeta,
    registry: &MetadataRegistry,
    opts: CompileOptions,
) -> Result<CompiledFilter, CompileError> {
    if filter.trim().is_empty() {
        return Ok(CompiledFilter::default());
    }
    let value: Value = serde_json::from_str(filter).map_err(|e| {
        tracing::warn!(entity = meta.name(), error = %e, "malformed filter JSON");
        CompileError::CompilationFailed(format!("malformed JSON: {e}"))
    })?;
    compile(&value, meta, registry, opts)
}

#[derive(Default)]
struct Parts {
    and: Vec<Predicate>,
    or_groups: Vec<Predicate>,
}

impl Parts {
    fn into_predicate(self) -> Predicate {
        let mut all = self.and;
        all.extend(self.or_groups);
        Predicate::and(all)
    }
}

struct Compiler<'r> {
    registry: &'r MetadataRegistry,
    max_depth: usize,
    alias_seq: usize,
}

impl Compiler<'_> {
    fn object(
        &mut self,
        obj: &Map<String, Value>,
        meta: &EntityMeta,
        alias: &str,
        depth: usize,
    ) -> Result<Parts, CompileError> {
        if depth > self.max_depth {
            return Err(CompileError::CompilationFailed(format!(
                "filter nesting exceeds {} levels",
                self.max_depth
            )));
        }

        let mut parts = Parts::default();
        for (key, value) in sorted(obj) {
            match key {
                "$and" => self.and_list(value, meta, alias, depth, &mut parts)?,
                "$or" => self.or_list(value, meta, alias, depth, &mut parts)?,
                op if op.starts_with('$') => {
                    debug!(entity = meta.name(), operator = op, "unknown combinator dropped");
                }
                field => self.field(field, value, meta, alias, depth, &mut parts.and)?,
            }
        }
        parts.and = merge_bounds(parts.and);
        Ok(parts)
    }

    fn and_list(
        &mut self,
        value: &Value,
        meta: &EntityMeta,
        alias: &str,
        depth: usize,
        parts: &mut Parts,
    ) -> Result<(), CompileError> {
        let Some(items) = value.as_array() else {
            debug!(entity = meta.name(), "$and expects an array; dropped");
            return Ok(());
        };
        for item in items {
            let Some(obj) = item.as_object() else {
                debug!(entity = meta.name(), "non-object $and element dropped");
                continue;
            };
            let sub = self.object(obj, meta, alias, depth + 1)?;
            parts.and.extend(sub.and);
            parts.or_groups.extend(sub.or_groups);
        }
        Ok(())
    }

    fn or_list(
        &mut self,
        value: &Value,
        meta: &EntityMeta,
        alias: &str,
        depth: usize,
        parts: &mut Parts,
    ) -> Result<(), CompileError> {
        let Some(items) = value.as_array() else {
            debug!(entity = meta.name(), "$or expects an array; dropped");
            return Ok(());
        };
        let mut branches = Vec::with_capacity(items.len());
        let mut always = false;
        for item in items {
            let Some(obj) = item.as_object() else {
                debug!(entity = meta.name(), "non-object $or element dropped");
                continue;
            };
            let branch = self.object(obj, meta, alias, depth + 1)?.into_predicate();
            if branch.is_trivially_true() {
                always = true;
            } else {
                branches.push(branch);
            }
        }
        // An unconstrained branch makes the whole group hold.
        if !always && !branches.is_empty() {
            parts.or_groups.push(Predicate::or(branches));
        }
        Ok(())
    }

    fn field(
        &mut self,
        name: &str,
        value: &Value,
        meta: &EntityMeta,
        alias: &str,
        depth: usize,
        out: &mut Vec<Predicate>,
    ) -> Result<(), CompileError> {
        let Some(field) = meta.field(name) else {
            debug!(entity = meta.name(), field = name, "unknown filter field dropped");
            return Ok(());
        };
        if let Some(rel) = &field.relation {
            return self.relation(field, rel, value, meta, alias, depth, out);
        }
        scalar_condition(&ColumnRef::new(alias, &field.column), value, out);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn relation(
        &mut self,
        field: &FieldMeta,
        rel: &Relation,
        value: &Value,
        meta: &EntityMeta,
        alias: &str,
        depth: usize,
        out: &mut Vec<Predicate>,
    ) -> Result<(), CompileError> {
        let (Some(target), Some(local_col)) =
            (self.registry.get(&rel.target), meta.column_of(&rel.local_key))
        else {
            debug!(entity = meta.name(), field = %field.name, "unresolvable relation dropped");
            return Ok(());
        };
        let Some(foreign_col) = target.column_of(&rel.foreign_key) else {
            debug!(entity = meta.name(), field = %field.name, "unresolvable relation key dropped");
            return Ok(());
        };
        let column = ColumnRef::new(alias, local_col);

        let obj = match value {
            Value::Object(obj) if !is_operator_object(obj) => obj,
            // Scalars and operator objects on an owned reference address its key.
            other if rel.kind == RelationKind::OwnedReference => {
                scalar_condition(&column, other, out);
                return Ok(());
            }
            _ => {
                debug!(entity = meta.name(), field = %field.name, "relation filter needs an object; dropped");
                return Ok(());
            }
        };

        let query = match (rel.kind, &rel.join) {
            (RelationKind::ManyToMany, Some(join)) => {
                let join_alias = self.next_alias(&join.table);
                let target_alias = self.next_alias(target.table());
                let inner = self.object(obj, &target, &target_alias, depth + 1)?;
                SubQuery {
                    table: join.table.clone(),
                    alias: join_alias.clone(),
                    select: join.source_key.clone(),
                    filter: Box::new(Predicate::InSubquery {
                        column: ColumnRef::new(join_alias, &join.target_key),
                        query: SubQuery {
                            table: target.table().to_owned(),
                            alias: target_alias,
                            select: foreign_col.to_owned(),
                            filter: Box::new(inner.into_predicate()),
                        },
                    }),
                }
            }
            (RelationKind::ManyToMany, None) => {
                debug!(entity = meta.name(), field = %field.name, "many-to-many without join table dropped");
                return Ok(());
            }
            (RelationKind::OwnedReference | RelationKind::OneToMany, _) => {
                let target_alias = self.next_alias(target.table());
                let inner = self.object(obj, &target, &target_alias, depth + 1)?;
                SubQuery {
                    table: target.table().to_owned(),
                    alias: target_alias,
                    select: foreign_col.to_owned(),
                    filter: Box::new(inner.into_predicate()),
                }
            }
        };
        out.push(Predicate::InSubquery { column, query });
        Ok(())
    }

    fn next_alias(&mut self, table: &str) -> String {
        self.alias_seq += 1;
        format!("{table}_{}", self.alias_seq)
    }
}

fn sorted(obj: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let mut entries: Vec<(&str, &Value)> = obj.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn is_operator_object(obj: &Map<String, Value>) -> bool {
    !obj.is_empty()
        && obj
            .keys()
            .all(|k| k.starts_with('$') && k != "$and" && k != "$or")
}

/// Conditions on a plain column: scalar equality, `null`, or an operator object.
fn scalar_condition(column: &ColumnRef, value: &Value, out: &mut Vec<Predicate>) {
    match value {
        Value::Object(ops) => operators(column, ops, out),
        Value::Array(_) => debug!(column = %column.column, "array value needs an operator; dropped"),
        other => out.push(eq_or_null(column, other, false)),
    }
}

fn eq_or_null(column: &ColumnRef, value: &Value, negated: bool) -> Predicate {
    if value.is_null() {
        Predicate::Null {
            column: column.clone(),
            negated,
        }
    } else {
        Predicate::Compare {
            column: column.clone(),
            op: if negated { CompareOp::Ne } else { CompareOp::Eq },
            value: value.clone(),
        }
    }
}

fn operators(column: &ColumnRef, ops: &Map<String, Value>, out: &mut Vec<Predicate>) {
    let mut lower: Option<Bound> = None;
    let mut upper: Option<Bound> = None;

    for (op, value) in sorted(ops) {
        match op {
            "$eq" | "$ne" if value.is_array() || value.is_object() => {
                debug!(column = %column.column, operator = op, "non-scalar operand dropped");
            }
            "$eq" => out.push(eq_or_null(column, value, false)),
            "$ne" => out.push(eq_or_null(column, value, true)),
            "$in" => match value {
                Value::Array(items) if items.is_empty() => out.push(Predicate::Const(false)),
                Value::Array(items) => out.push(Predicate::In {
                    column: column.clone(),
                    values: items.clone(),
                    negated: false,
                }),
                single => out.push(Predicate::In {
                    column: column.clone(),
                    values: vec![single.clone()],
                    negated: false,
                }),
            },
            "$nin" => match value {
                Value::Array(items) if items.is_empty() => {}
                Value::Array(items) => out.push(Predicate::In {
                    column: column.clone(),
                    values: items.clone(),
                    negated: true,
                }),
                single => out.push(Predicate::In {
                    column: column.clone(),
                    values: vec![single.clone()],
                    negated: true,
                }),
            },
            "$exists" => out.push(Predicate::Null {
                column: column.clone(),
                negated: truthy(value),
            }),
            "$regex" => match value.as_str() {
                Some(re) => out.push(Predicate::Like {
                    column: column.clone(),
                    pattern: like_pattern(re),
                }),
                None => debug!(column = %column.column, "$regex expects a string; dropped"),
            },
            // Sorted keys: `$gte` follows `$gt` and `$lte` follows `$lt`, so
            // the later key wins when both are given.
            "$gt" | "$gte" => {
                lower = Some(Bound {
                    value: value.clone(),
                    inclusive: op == "$gte",
                });
            }
            "$lt" | "$lte" => {
                upper = Some(Bound {
                    value: value.clone(),
                    inclusive: op == "$lte",
                });
            }
            unknown => debug!(column = %column.column, operator = unknown, "unknown operator dropped"),
        }
    }

    match (lower, upper) {
        (Some(lower), Some(upper)) => out.push(Predicate::Between {
            column: column.clone(),
            lower,
            upper,
        }),
        (Some(b), None) => out.push(Predicate::Compare {
            column: column.clone(),
            op: b.lower_op(),
            value: b.value,
        }),
        (None, Some(b)) => out.push(Predicate::Compare {
            column: column.clone(),
            op: b.upper_op(),
            value: b.value,
        }),
        (None, None) => {}
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_none_or(|i| i != 0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Translate an anchored pattern into `LIKE` syntax.
///
/// `^x$` matches exactly, `^x` is a prefix match, `x$` a suffix match and a
/// bare `x` a containment match. `%`, `_` and `\` in the literal are escaped.
pub(crate) fn like_pattern(re: &str) -> String {
    let (anchored_start, rest) = match re.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, re),
    };
    let (anchored_end, body) = match rest.strip_suffix('$') {
        Some(body) => (true, body),
        None => (false, rest),
    };

    let mut pattern = String::with_capacity(body.len() + 2);
    if !anchored_start {
        pattern.push('%');
    }
    for ch in body.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    if !anchored_end {
        pattern.push('%');
    }
    pattern
}

/// Merge single-sided bounds on the same column into one two-sided bound.
///
/// Only columns with exactly one lower and one upper bound are merged; any
/// other combination is left as independent comparisons.
fn merge_bounds(preds: Vec<Predicate>) -> Vec<Predicate> {
    #[derive(Default)]
    struct Sides {
        lower: Vec<Bound>,
        upper: Vec<Bound>,
    }

    let mut sides: BTreeMap<ColumnRef, Sides> = BTreeMap::new();
    for p in &preds {
        if let Predicate::Compare { column, op, value } = p {
            let bound = Bound {
                value: value.clone(),
                inclusive: matches!(op, CompareOp::Gte | CompareOp::Lte),
            };
            if op.is_lower_bound() {
                sides.entry(column.clone()).or_default().lower.push(bound);
            } else if op.is_upper_bound() {
                sides.entry(column.clone()).or_default().upper.push(bound);
            }
        }
    }
    sides.retain(|_, s| s.lower.len() == 1 && s.upper.len() == 1);
    if sides.is_empty() {
        return preds;
    }

    let mut emitted: BTreeSet<ColumnRef> = BTreeSet::new();
    let mut out = Vec::with_capacity(preds.len());
    for p in preds {
        match p {
            Predicate::Compare { ref column, op, .. }
                if (op.is_lower_bound() || op.is_upper_bound()) && sides.contains_key(column) =>
            {
                // First side seen emits the merged bound; the other is absorbed.
                if emitted.insert(column.clone())
                    && let Some(s) = sides.get(column)
                    && let (Some(lower), Some(upper)) = (s.lower.first(), s.upper.first())
                {
                    out.push(Predicate::Between {
                        column: column.clone(),
                        lower: lower.clone(),
                        upper: upper.clone(),
                    });
                }
            }
            other => out.push(other),
        }
    }
    out
}
