//! Lowering of [`Predicate`] trees into `SeaORM` conditions.

use sea_orm::Condition;
use sea_orm::sea_query::{
    Alias, ConditionalStatement, Expr, LikeExpr, Query, SelectStatement, SimpleExpr,
};
use serde_json::Value as JsonValue;

use crate::filter::{ColumnRef, CompareOp, Predicate, SubQuery};

/// Convert a JSON scalar to a `sea_orm::Value` for binding.
#[must_use]
pub fn json_to_sea_value(v: &JsonValue) -> sea_orm::Value {
    match v {
        JsonValue::Null => sea_orm::Value::String(None),
        JsonValue::Bool(b) => sea_orm::Value::from(*b),
        JsonValue::Number(n) => n.as_i64().map_or_else(
            || sea_orm::Value::from(n.as_f64().unwrap_or_default()),
            sea_orm::Value::from,
        ),
        JsonValue::String(s) => sea_orm::Value::from(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => sea_orm::Value::from(v.clone()),
    }
}

fn col(c: &ColumnRef) -> Expr {
    Expr::col((Alias::new(&c.alias), Alias::new(&c.column)))
}

fn compare(c: &ColumnRef, op: CompareOp, v: &JsonValue) -> SimpleExpr {
    let v = json_to_sea_value(v);
    match op {
        CompareOp::Eq => col(c).eq(v),
        CompareOp::Ne => col(c).ne(v),
        CompareOp::Gt => col(c).gt(v),
        CompareOp::Gte => col(c).gte(v),
        CompareOp::Lt => col(c).lt(v),
        CompareOp::Lte => col(c).lte(v),
    }
}

/// Build a deny-all condition (`WHERE false`).
fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

fn subquery(q: &SubQuery) -> SelectStatement {
    let mut stmt = Query::select();
    stmt.column((Alias::new(&q.alias), Alias::new(&q.select)))
        .from_as(Alias::new(&q.table), Alias::new(&q.alias));
    if !q.filter.is_trivially_true() {
        stmt.cond_where(build_condition(&q.filter));
    }
    stmt
}

/// Lower a predicate into a condition with the same truth table.
#[must_use]
pub fn build_condition(p: &Predicate) -> Condition {
    match p {
        Predicate::Compare { column, op, value } => {
            Condition::all().add(compare(column, *op, value))
        }
        Predicate::In {
            column,
            values,
            negated,
        } => {
            let values = values.iter().map(json_to_sea_value);
            Condition::all().add(if *negated {
                col(column).is_not_in(values)
            } else {
                col(column).is_in(values)
            })
        }
        Predicate::Null { column, negated } => Condition::all().add(if *negated {
            col(column).is_not_null()
        } else {
            col(column).is_null()
        }),
        Predicate::Like { column, pattern } => {
            Condition::all().add(col(column).like(LikeExpr::new(pattern).escape('\\')))
        }
        Predicate::Between {
            column,
            lower,
            upper,
        } => Condition::all()
            .add(compare(column, lower.lower_op(), &lower.value))
            .add(compare(column, upper.upper_op(), &upper.value)),
        Predicate::InSubquery { column, query } => {
            Condition::all().add(col(column).in_subquery(subquery(query)))
        }
        Predicate::And(parts) => parts
            .iter()
            .fold(Condition::all(), |acc, p| acc.add(build_condition(p))),
        Predicate::Or(parts) if parts.is_empty() => deny_all(),
        Predicate::Or(parts) => parts
            .iter()
            .fold(Condition::any(), |acc, p| acc.add(build_condition(p))),
        Predicate::Const(true) => Condition::all(),
        Predicate::Const(false) => deny_all(),
    }
}
