#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use adminkit_db::metadata::{
    DescribeEntity, EntityDescriptor, FieldDescriptor, FieldTag, MetadataRegistry,
};
use adminkit_db::{ConnectOpts, Db, Record};
use adminkit_pipeline::{CallbackRegistry, LifecycleRegistry, Pipeline};
use adminkit_security::constants::DEFAULT_ROOT_PRINCIPAL_ID;
use adminkit_security::{DataRange, SecurityContext};
use privilege_resolver::PrivilegeResolverModule;
use privilege_resolver::config::{PrivilegeResolverConfig, StaticSourceConfig};
use privilege_resolver_sdk::{DataPrivilege, Organization, Role, RoleAssignment};
use sea_orm::ConnectionTrait;
use sea_orm::sea_query::{Alias, ColumnDef, Table, TableCreateStatement};
use serde_json::{Value, json};
use uuid::Uuid;

//        R
//      /   \
//     A     B
//     |
//     A1
pub const R: Uuid = Uuid::from_u128(0x10);
pub const A: Uuid = Uuid::from_u128(0x11);
pub const B: Uuid = Uuid::from_u128(0x12);
pub const A1: Uuid = Uuid::from_u128(0x13);

/// Reads A and below, writes A.
pub const ALICE: Uuid = Uuid::from_u128(0xa1);
/// Only personal ranges: no readable or writable organization.
pub const CAROL: Uuid = Uuid::from_u128(0xc0);
/// No role assignment.
pub const BOB: Uuid = Uuid::from_u128(0xb0);
pub const OTHER: Uuid = Uuid::from_u128(0xff);
pub const ROOT: Uuid = DEFAULT_ROOT_PRINCIPAL_ID;

pub struct User;

impl DescribeEntity for User {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("user")
            .table("users")
            .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("name"))
            .field(FieldDescriptor::new("age"))
            .field(FieldDescriptor::new("org_id").tag(FieldTag::OwnerOrg))
            .field(FieldDescriptor::new("created_by").tag(FieldTag::Owner))
            .field(FieldDescriptor::new("updated_by").tag(FieldTag::LastModifier))
            .field(FieldDescriptor::new("password").tag(FieldTag::Secret))
            .field(FieldDescriptor::new("deleted_at").tag(FieldTag::SoftDelete))
    }
}

/// Organization-owned, no owner field.
pub struct Dept;

impl DescribeEntity for Dept {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("dept")
            .table("departments")
            .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("name"))
            .field(FieldDescriptor::new("org_id").tag(FieldTag::OwnerOrg))
    }
}

pub struct Setting;

impl DescribeEntity for Setting {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("setting")
            .table("settings")
            .unrestricted()
            .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("value"))
    }
}

pub fn metadata() -> Arc<MetadataRegistry> {
    let mut reg = MetadataRegistry::new();
    reg.register::<User>().expect("user");
    reg.register::<Dept>().expect("dept");
    reg.register::<Setting>().expect("setting");
    reg.validate().expect("valid registry");
    Arc::new(reg)
}

fn privileges() -> PrivilegeResolverModule {
    let role = Role {
        id: Uuid::from_u128(1),
        code: "a-manager".to_owned(),
        name: "A manager".to_owned(),
        operation_permissions: vec!["user:read".to_owned()],
        data_privileges: vec![DataPrivilege::new(
            A,
            DataRange::CurrentFollowing,
            DataRange::Current,
        )],
    };
    let self_service = Role {
        id: Uuid::from_u128(2),
        code: "self-service".to_owned(),
        name: "Self service".to_owned(),
        operation_permissions: vec![],
        data_privileges: vec![DataPrivilege::new(A, DataRange::Personal, DataRange::Personal)],
    };
    PrivilegeResolverModule::from_static(
        &PrivilegeResolverConfig::default(),
        StaticSourceConfig {
            organizations: vec![
                Organization::new(R, "R", None),
                Organization::new(A, "A", Some(R)),
                Organization::new(B, "B", Some(R)),
                Organization::new(A1, "A1", Some(A)),
            ],
            roles: vec![role, self_service],
            assignments: vec![
                RoleAssignment::new(ALICE, Uuid::from_u128(1)),
                RoleAssignment::new(CAROL, Uuid::from_u128(2)),
            ],
        },
    )
}

pub fn ctx(user: Uuid, org: Uuid) -> SecurityContext {
    SecurityContext::builder()
        .principal_id(user)
        .active_org_id(org)
        .build()
}

pub fn record(v: Value) -> Record {
    match v {
        Value::Object(map) => map,
        other => panic!("record must be an object, got {other}"),
    }
}

fn text(name: &str) -> ColumnDef {
    ColumnDef::new(Alias::new(name)).string().null().to_owned()
}

fn users() -> TableCreateStatement {
    Table::create()
        .table(Alias::new("users"))
        .col(ColumnDef::new(Alias::new("id")).string().not_null().primary_key())
        .col(text("name"))
        .col(ColumnDef::new(Alias::new("age")).big_integer().null())
        .col(text("org_id"))
        .col(text("created_by"))
        .col(text("updated_by"))
        .col(text("password"))
        .col(text("deleted_at"))
        .to_owned()
}

fn departments() -> TableCreateStatement {
    Table::create()
        .table(Alias::new("departments"))
        .col(ColumnDef::new(Alias::new("id")).string().not_null().primary_key())
        .col(text("name"))
        .col(text("org_id"))
        .to_owned()
}

fn settings() -> TableCreateStatement {
    Table::create()
        .table(Alias::new("settings"))
        .col(ColumnDef::new(Alias::new("id")).string().not_null().primary_key())
        .col(text("value"))
        .to_owned()
}

/// | id | org | owner | age |
/// |----|-----|-------|-----|
/// | u1 | A | other | 30 |
/// | u2 | A1 | other | 17 |
/// | u3 | B | other | 40 |
/// | u4 | B | alice | 50 |
/// | u5 | R | other | 60 |
fn seed_users() -> Vec<Record> {
    [
        ("u1", A, OTHER, 30),
        ("u2", A1, OTHER, 17),
        ("u3", B, OTHER, 40),
        ("u4", B, ALICE, 50),
        ("u5", R, OTHER, 60),
    ]
    .into_iter()
    .map(|(id, org, owner, age)| {
        record(json!({
            "id": id,
            "name": format!("user {id}"),
            "age": age,
            "org_id": org.to_string(),
            "created_by": owner.to_string(),
            "password": "secret",
        }))
    })
    .collect()
}

pub struct Fixture {
    pub db: Db,
    pub metadata: Arc<MetadataRegistry>,
    pub resolver: PrivilegeResolverModule,
}

impl Fixture {
    /// Fresh shared-cache in-memory database with seeded users.
    pub async fn new(name: &str) -> Self {
        let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
        let db = Db::connect(&url, ConnectOpts {
            max_conns: Some(1),
            ..Default::default()
        })
        .await
        .expect("connect");
        let backend = db.conn().get_database_backend();
        for stmt in [users(), departments(), settings()] {
            db.conn()
                .execute(backend.build(&stmt))
                .await
                .expect("create table");
        }

        let metadata = metadata();
        let user = metadata.get("user").expect("user meta");
        for row in seed_users() {
            adminkit_db::store::insert_row(db.conn(), &user, &row)
                .await
                .expect("seed");
        }

        Self {
            db,
            metadata,
            resolver: privileges(),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with(Arc::new(CallbackRegistry::with_builtins()), LifecycleRegistry::new())
    }

    pub fn pipeline_with(&self, callbacks: Arc<CallbackRegistry>, lifecycle: LifecycleRegistry) -> Pipeline {
        Pipeline::builder(self.db.clone(), self.metadata.clone(), self.resolver.client())
            .callbacks(callbacks)
            .lifecycle(lifecycle)
            .build()
    }
}

pub fn ids(rows: &[Record]) -> Vec<String> {
    rows.iter()
        .map(|r| r["id"].as_str().expect("string id").to_owned())
        .collect()
}
