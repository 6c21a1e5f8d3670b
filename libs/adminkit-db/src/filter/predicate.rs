//! Backend-neutral predicate tree.
//!
//! Predicates render to SQL text with `?` placeholders and an ordered
//! parameter list (see [`Predicate::render`]); [`crate::cond`] lowers the same
//! tree into a `SeaORM` condition for execution.

use std::fmt::Write as _;

use serde_json::Value;

/// A column qualified by its table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    #[must_use]
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    #[must_use]
    pub fn is_lower_bound(self) -> bool {
        matches!(self, Self::Gt | Self::Gte)
    }

    #[must_use]
    pub fn is_upper_bound(self) -> bool {
        matches!(self, Self::Lt | Self::Lte)
    }
}

/// One side of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Value,
    pub inclusive: bool,
}

impl Bound {
    #[must_use]
    pub fn lower_op(&self) -> CompareOp {
        if self.inclusive {
            CompareOp::Gte
        } else {
            CompareOp::Gt
        }
    }

    #[must_use]
    pub fn upper_op(&self) -> CompareOp {
        if self.inclusive {
            CompareOp::Lte
        } else {
            CompareOp::Lt
        }
    }
}

/// `SELECT alias.select FROM table alias WHERE filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub table: String,
    pub alias: String,
    pub select: String,
    pub filter: Box<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: Value,
    },
    In {
        column: ColumnRef,
        values: Vec<Value>,
        negated: bool,
    },
    Null {
        column: ColumnRef,
        negated: bool,
    },
    /// `LIKE` with `\` as the escape character.
    Like { column: ColumnRef, pattern: String },
    /// Two-sided range on one column.
    Between {
        column: ColumnRef,
        lower: Bound,
        upper: Bound,
    },
    InSubquery { column: ColumnRef, query: SubQuery },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Const(bool),
}

impl Predicate {
    /// AND of `parts`, collapsing the single-element case.
    #[must_use]
    pub fn and(mut parts: Vec<Predicate>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Self::And(parts)
        }
    }

    /// OR of `parts`, collapsing the single-element case.
    #[must_use]
    pub fn or(mut parts: Vec<Predicate>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Self::Or(parts)
        }
    }

    /// `true` for predicates that always hold (`Const(true)`, empty AND).
    #[must_use]
    pub fn is_trivially_true(&self) -> bool {
        match self {
            Self::Const(b) => *b,
            Self::And(parts) => parts.iter().all(Self::is_trivially_true),
            _ => false,
        }
    }

    /// Render as SQL text with `?` placeholders, appending bound values to
    /// `params` in placeholder order.
    pub fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Self::Compare { column, op, value } => {
                push_col(sql, column);
                _ = write!(sql, " {} ?", op.as_sql());
                params.push(value.clone());
            }
            Self::In {
                column,
                values,
                negated,
            } => {
                push_col(sql, column);
                sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                    params.push(v.clone());
                }
                sql.push(')');
            }
            Self::Null { column, negated } => {
                push_col(sql, column);
                sql.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Self::Like { column, pattern } => {
                push_col(sql, column);
                sql.push_str(" LIKE ? ESCAPE '\\'");
                params.push(Value::String(pattern.clone()));
            }
            Self::Between {
                column,
                lower,
                upper,
            } => {
                if lower.inclusive && upper.inclusive {
                    push_col(sql, column);
                    sql.push_str(" BETWEEN ? AND ?");
                } else {
                    sql.push('(');
                    push_col(sql, column);
                    _ = write!(sql, " {} ? AND ", lower.lower_op().as_sql());
                    push_col(sql, column);
                    _ = write!(sql, " {} ?)", upper.upper_op().as_sql());
                }
                params.push(lower.value.clone());
                params.push(upper.value.clone());
            }
            Self::InSubquery { column, query } => {
                push_col(sql, column);
                _ = write!(
                    sql,
                    " IN (SELECT {}.{} FROM {} {}",
                    query.alias, query.select, query.table, query.alias
                );
                if !query.filter.is_trivially_true() {
                    sql.push_str(" WHERE ");
                    query.filter.render(sql, params);
                }
                sql.push(')');
            }
            Self::And(parts) => render_joined(sql, params, parts, " AND ", "1 = 1"),
            Self::Or(parts) => render_joined(sql, params, parts, " OR ", "1 = 0"),
            Self::Const(true) => sql.push_str("1 = 1"),
            Self::Const(false) => sql.push_str("1 = 0"),
        }
    }

    /// Rendered SQL and its parameters.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render(&mut sql, &mut params);
        (sql, params)
    }
}

fn push_col(sql: &mut String, col: &ColumnRef) {
    _ = write!(sql, "{}.{}", col.alias, col.column);
}

fn render_joined(
    sql: &mut String,
    params: &mut Vec<Value>,
    parts: &[Predicate],
    sep: &str,
    empty: &str,
) {
    match parts {
        [] => sql.push_str(empty),
        [only] => only.render(sql, params),
        _ => {
            sql.push('(');
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    sql.push_str(sep);
                }
                p.render(sql, params);
            }
            sql.push(')');
        }
    }
}
