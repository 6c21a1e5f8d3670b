#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use adminkit_db::filter::{self, CompileError, CompileOptions, ColumnRef, CompareOp, Predicate};
use serde_json::{Value, json};

fn compile_user(expr: &Value) -> adminkit_db::CompiledFilter {
    let reg = common::registry();
    let meta = reg.get("user").unwrap();
    filter::compile(expr, &meta, &reg, CompileOptions::default()).unwrap()
}

fn compile_dept(expr: &Value) -> adminkit_db::CompiledFilter {
    let reg = common::registry();
    let meta = reg.get("dept").unwrap();
    filter::compile(expr, &meta, &reg, CompileOptions::default()).unwrap()
}

#[test]
fn scalar_value_is_equality() {
    let f = compile_user(&json!({"name": "alice"}));
    assert_eq!(f.to_sql(), "users.name = ?");
    assert_eq!(f.params(), vec![json!("alice")]);
}

#[test]
fn null_value_is_null_check() {
    let f = compile_user(&json!({"name": null, "age": {"$ne": null}}));
    assert_eq!(f.to_sql(), "users.age IS NOT NULL AND users.name IS NULL");
    assert!(f.params().is_empty());
}

#[test]
fn and_of_bounds_merges_into_one_range() {
    let f = compile_user(&json!({"$and": [{"age": {"$gte": 18}}, {"age": {"$lt": 65}}]}));
    assert_eq!(f.fragments().len(), 1);
    assert_eq!(f.to_sql(), "(users.age >= ? AND users.age < ?)");
    assert_eq!(f.params(), vec![json!(18), json!(65)]);
}

#[test]
fn inclusive_bounds_render_between() {
    let f = compile_user(&json!({"age": {"$lte": 65, "$gte": 18}}));
    assert_eq!(f.to_sql(), "users.age BETWEEN ? AND ?");
    assert_eq!(f.params(), vec![json!(18), json!(65)]);
}

#[test]
fn single_sided_bound_stays_single() {
    let f = compile_user(&json!({"age": {"$gt": 21}}));
    assert_eq!(
        f.fragments(),
        &[Predicate::Compare {
            column: ColumnRef::new("users", "age"),
            op: CompareOp::Gt,
            value: json!(21),
        }]
    );
}

#[test]
fn compiling_twice_is_identical() {
    let expr = json!({
        "$or": [{"name": {"$regex": "^al"}}, {"age": {"$in": [1, 2]}}],
        "dept": {"name": "R&D"},
        "age": {"$gte": 18, "$lt": 65}
    });
    let a = compile_user(&expr);
    let b = compile_user(&expr);
    assert_eq!(a, b);
    assert_eq!(a.to_sql(), b.to_sql());
    assert_eq!(a.params(), b.params());
}

#[test]
fn in_and_nin_edge_cases() {
    let f = compile_user(&json!({"age": {"$in": [1, 2, 3]}}));
    assert_eq!(f.to_sql(), "users.age IN (?, ?, ?)");

    let f = compile_user(&json!({"age": {"$in": 7}}));
    assert_eq!(f.to_sql(), "users.age IN (?)");

    let f = compile_user(&json!({"age": {"$in": []}}));
    assert_eq!(f.to_sql(), "1 = 0");

    let f = compile_user(&json!({"age": {"$nin": []}}));
    assert!(f.is_empty());

    let f = compile_user(&json!({"name": {"$nin": ["x"]}}));
    assert_eq!(f.to_sql(), "users.name NOT IN (?)");
}

#[test]
fn exists_binds_no_value() {
    let f = compile_user(&json!({"dept_id": {"$exists": true}, "name": {"$exists": false}}));
    assert_eq!(
        f.to_sql(),
        "users.dept_id IS NOT NULL AND users.name IS NULL"
    );
    assert!(f.params().is_empty());
}

#[test]
fn regex_becomes_like() {
    let f = compile_user(&json!({"name": {"$regex": "^ali"}}));
    assert_eq!(f.to_sql(), "users.name LIKE ? ESCAPE '\\'");
    assert_eq!(f.params(), vec![json!("ali%")]);

    let f = compile_user(&json!({"name": {"$regex": "ice"}}));
    assert_eq!(f.params(), vec![json!("%ice%")]);

    let f = compile_user(&json!({"name": {"$regex": "^alice$"}}));
    assert_eq!(f.params(), vec![json!("alice")]);
}

#[test]
fn unknown_fields_and_operators_are_dropped() {
    let f = compile_user(&json!({
        "nickname": "bob",
        "age": {"$near": 3},
        "$nor": [{"name": "x"}],
        "name": "bob"
    }));
    assert_eq!(f.to_sql(), "users.name = ?");
}

#[test]
fn top_level_or_is_kept_apart() {
    let mut f = compile_user(&json!({"$or": [{"name": "a"}, {"name": "b"}], "age": 3}));
    assert_eq!(f.fragments().len(), 1);
    assert_eq!(f.or_groups().len(), 1);

    f.push_fragment(Predicate::Compare {
        column: ColumnRef::new("users", "org_id"),
        op: CompareOp::Eq,
        value: json!("o1"),
    });
    assert_eq!(
        f.to_sql(),
        "users.age = ? AND users.org_id = ? AND (users.name = ? OR users.name = ?)"
    );
    assert_eq!(f.params(), vec![json!(3), json!("o1"), json!("a"), json!("b")]);
}

#[test]
fn or_with_unconstrained_branch_is_dropped() {
    let f = compile_user(&json!({"$or": [{"name": "a"}, {"nickname": "b"}]}));
    assert!(f.is_empty());
}

#[test]
fn owned_reference_compiles_to_subquery() {
    let f = compile_user(&json!({"dept": {"name": "R&D"}}));
    assert_eq!(
        f.to_sql(),
        "users.dept_id IN (SELECT departments_1.id FROM departments departments_1 \
         WHERE departments_1.name = ?)"
    );
    assert_eq!(f.params(), vec![json!("R&D")]);
}

#[test]
fn owned_reference_scalar_targets_local_key() {
    let f = compile_user(&json!({"dept": "d1", "roles": "r1"}));
    assert_eq!(f.to_sql(), "users.dept_id = ?");
}

#[test]
fn one_to_many_selects_foreign_key() {
    let f = compile_dept(&json!({"users": {"age": {"$gt": 30}}}));
    assert_eq!(
        f.to_sql(),
        "departments.id IN (SELECT users_1.dept_id FROM users users_1 WHERE users_1.age > ?)"
    );
}

#[test]
fn many_to_many_goes_through_join_table() {
    let f = compile_user(&json!({"roles": {"code": "admin"}}));
    assert_eq!(
        f.to_sql(),
        "users.id IN (SELECT user_roles_1.user_id FROM user_roles user_roles_1 \
         WHERE user_roles_1.role_id IN (SELECT roles_2.id FROM roles roles_2 \
         WHERE roles_2.code = ?))"
    );
}

#[test]
fn self_reference_gets_distinct_aliases() {
    let f = compile_dept(&json!({"parent": {"parent": {"name": "root"}}}));
    assert_eq!(
        f.to_sql(),
        "departments.parent_id IN (SELECT departments_1.id FROM departments departments_1 \
         WHERE departments_1.parent_id IN (SELECT departments_2.id FROM departments departments_2 \
         WHERE departments_2.name = ?))"
    );
}

#[test]
fn malformed_input_fails() {
    let reg = common::registry();
    let meta = reg.get("user").unwrap();
    let opts = CompileOptions::default();

    assert!(matches!(
        filter::compile_str("{\"name\": ", &meta, &reg, opts),
        Err(CompileError::CompilationFailed(_))
    ));
    assert!(matches!(
        filter::compile(&json!([1, 2]), &meta, &reg, opts),
        Err(CompileError::CompilationFailed(_))
    ));
    assert!(filter::compile_str("  ", &meta, &reg, opts).unwrap().is_empty());
}

fn nested_and(levels: usize) -> Value {
    let mut v = json!({"age": 1});
    for _ in 0..levels {
        v = json!({"$and": [v]});
    }
    v
}

#[test]
fn nesting_limit_is_enforced() {
    let reg = common::registry();
    let meta = reg.get("user").unwrap();

    let ok = filter::compile(&nested_and(8), &meta, &reg, CompileOptions::default()).unwrap();
    assert_eq!(ok.to_sql(), "users.age = ?");

    let err = filter::compile(&nested_and(9), &meta, &reg, CompileOptions::default());
    assert!(matches!(err, Err(CompileError::CompilationFailed(_))));

    let relaxed = CompileOptions { max_depth: 16 };
    assert!(filter::compile(&nested_and(9), &meta, &reg, relaxed).is_ok());
}
