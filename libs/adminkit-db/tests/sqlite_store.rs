#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use adminkit_db::cond::build_condition;
use adminkit_db::filter::{self, CompileOptions};
use adminkit_db::scope::scope_predicate;
use adminkit_db::store::{count_rows, delete_rows, insert_row, select_rows, update_rows};
use adminkit_db::{EntityMeta, Record};
use adminkit_security::AccessScope;
use serde_json::{Value, json};
use uuid::Uuid;

const ORG_A: &str = "11111111-1111-1111-1111-111111111111";
const ORG_B: &str = "22222222-2222-2222-2222-222222222222";
const ALICE: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";

fn uid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap()
}

fn record(v: Value) -> Record {
    match v {
        Value::Object(map) => map,
        _ => panic!("record must be an object"),
    }
}

async fn seed(conn: &impl sea_orm::ConnectionTrait, meta: &EntityMeta) {
    let rows = [
        json!({"id": "u1", "name": "ann", "age": 17, "org_id": ORG_A, "created_by": ALICE, "password": "x"}),
        json!({"id": "u2", "name": "bob", "age": 30, "org_id": ORG_A, "created_by": ORG_B, "password": "x"}),
        json!({"id": "u3", "name": "cid", "age": 44, "org_id": ORG_B, "created_by": ORG_B, "password": "x"}),
        json!({"id": "u4", "name": "dan", "age": 70, "org_id": ORG_B, "created_by": ALICE, "password": "x"}),
    ];
    for row in rows {
        assert_eq!(insert_row(conn, meta, &record(row)).await.unwrap(), 1);
    }
}

fn scoped(meta: &EntityMeta, expr: &Value, scope: &AccessScope) -> sea_orm::Condition {
    let reg = common::registry();
    let mut compiled = filter::compile(expr, meta, &reg, CompileOptions::default()).unwrap();
    compiled.push_fragment(scope_predicate(meta, scope, meta.table()));
    build_condition(&compiled.predicate())
}

fn ids(rows: &[Record]) -> Vec<&str> {
    rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn scoped_select_returns_org_or_owned_rows() {
    let db = common::schema::setup("store_select").await;
    let reg = common::registry();
    let meta = reg.get("user").unwrap();
    seed(db.conn(), &meta).await;

    let scope = AccessScope::orgs_or_owner([uid(ORG_A)], uid(ALICE));
    let cond = scoped(&meta, &json!({"age": {"$gte": 18}}), &scope);
    let rows = select_rows(db.conn(), &meta, cond.clone(), 0, None).await.unwrap();
    assert_eq!(ids(&rows), vec!["u2", "u4"]);
    assert_eq!(count_rows(db.conn(), &meta, cond).await.unwrap(), 2);
}

#[tokio::test]
async fn no_readable_orgs_and_no_ownership_is_empty_not_error() {
    let db = common::schema::setup("store_empty").await;
    let reg = common::registry();
    let meta = reg.get("user").unwrap();
    seed(db.conn(), &meta).await;

    let scope = AccessScope::orgs_or_owner([], Uuid::new_v4());
    let cond = scoped(&meta, &json!({}), &scope);
    let rows = select_rows(db.conn(), &meta, cond, 0, None).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn pagination_is_ordered_by_primary_key() {
    let db = common::schema::setup("store_page").await;
    let reg = common::registry();
    let meta = reg.get("user").unwrap();
    seed(db.conn(), &meta).await;

    let cond = scoped(&meta, &json!({}), &AccessScope::allow_all());
    let rows = select_rows(db.conn(), &meta, cond, 1, Some(2)).await.unwrap();
    assert_eq!(ids(&rows), vec!["u2", "u3"]);
}

#[tokio::test]
async fn update_and_delete_touch_only_scoped_rows() {
    let db = common::schema::setup("store_write").await;
    let reg = common::registry();
    let meta = reg.get("user").unwrap();
    seed(db.conn(), &meta).await;

    let scope = AccessScope::orgs_or_owner([uid(ORG_B)], Uuid::new_v4());
    let changes = record(json!({"name": "renamed", "unknown": 1}));
    let affected = update_rows(db.conn(), &meta, &changes, scoped(&meta, &json!({}), &scope))
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let deleted = delete_rows(db.conn(), &meta, scoped(&meta, &json!({"name": "ann"}), &scope))
        .await
        .unwrap();
    assert_eq!(deleted, 0);

    let all = scoped(&meta, &json!({"name": "renamed"}), &AccessScope::allow_all());
    assert_eq!(ids(&select_rows(db.conn(), &meta, all, 0, None).await.unwrap()), vec!["u3", "u4"]);
}

#[tokio::test]
async fn relation_subquery_executes() {
    let db = common::schema::setup("store_relation").await;
    let reg = common::registry();
    let users = reg.get("user").unwrap();
    let depts = reg.get("dept").unwrap();

    insert_row(db.conn(), &depts, &record(json!({"id": "d1", "name": "R&D"}))).await.unwrap();
    insert_row(db.conn(), &depts, &record(json!({"id": "d2", "name": "Sales"}))).await.unwrap();
    insert_row(db.conn(), &users, &record(json!({"id": "u1", "name": "ann", "dept_id": "d1"}))).await.unwrap();
    insert_row(db.conn(), &users, &record(json!({"id": "u2", "name": "bob", "dept_id": "d2"}))).await.unwrap();

    let cond = scoped(&users, &json!({"dept": {"name": {"$regex": "^R&"}}}), &AccessScope::allow_all());
    let rows = select_rows(db.conn(), &users, cond, 0, None).await.unwrap();
    assert_eq!(ids(&rows), vec!["u1"]);

    let cond = scoped(&depts, &json!({"users": {"name": "bob"}}), &AccessScope::allow_all());
    let rows = select_rows(db.conn(), &depts, cond, 0, None).await.unwrap();
    assert_eq!(ids(&rows), vec!["d2"]);
}

#[tokio::test]
async fn record_without_stored_fields_is_rejected() {
    let db = common::schema::setup("store_invalid").await;
    let reg = common::registry();
    let meta = reg.get("user").unwrap();

    let err = insert_row(db.conn(), &meta, &record(json!({"nickname": "x"}))).await;
    assert!(matches!(err, Err(adminkit_db::DbError::InvalidRecord(_))));
}
