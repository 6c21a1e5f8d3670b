#![allow(dead_code, clippy::expect_used)]

use adminkit_db::metadata::{
    DescribeEntity, EntityDescriptor, FieldDescriptor, FieldTag, MetadataRegistry, Relation,
};

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
            .field(FieldDescriptor::new("password").tag(FieldTag::Secret))
            .field(FieldDescriptor::new("dept_id"))
            .field(FieldDescriptor::new("dept").relation(Relation::owned_reference("dept", "dept_id")))
            .field(FieldDescriptor::new("roles").relation(Relation::many_to_many(
                "role",
                "user_roles",
                "user_id",
                "role_id",
            )))
    }
}

pub struct Dept;

impl DescribeEntity for Dept {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("dept")
            .table("departments")
            .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("name"))
            .field(FieldDescriptor::new("parent_id"))
            .field(FieldDescriptor::new("parent").relation(Relation::owned_reference("dept", "parent_id")))
            .field(FieldDescriptor::new("users").relation(Relation::one_to_many("user", "dept_id")))
    }
}

pub struct Role;

impl DescribeEntity for Role {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("role")
            .table("roles")
            .unrestricted()
            .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
            .field(FieldDescriptor::new("code"))
    }
}

pub fn registry() -> MetadataRegistry {
    let mut reg = MetadataRegistry::new();
    reg.register::<User>().expect("user");
    reg.register::<Dept>().expect("dept");
    reg.register::<Role>().expect("role");
    reg.validate().expect("valid registry");
    reg
}

pub mod schema {
    use adminkit_db::Db;
    use sea_orm::ConnectionTrait;
    use sea_orm::sea_query::{Alias, ColumnDef, Table, TableCreateStatement};

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
            .col(text("password"))
            .col(text("dept_id"))
            .to_owned()
    }

    fn departments() -> TableCreateStatement {
        Table::create()
            .table(Alias::new("departments"))
            .col(ColumnDef::new(Alias::new("id")).string().not_null().primary_key())
            .col(text("name"))
            .col(text("parent_id"))
            .to_owned()
    }

    /// Fresh shared-cache in-memory database with the fixture tables.
    pub async fn setup(name: &str) -> Db {
        let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
        let db = Db::connect(&url, adminkit_db::ConnectOpts {
            max_conns: Some(1),
            ..Default::default()
        })
        .await
        .expect("connect");
        let backend = db.conn().get_database_backend();
        for stmt in [users(), departments()] {
            db.conn()
                .execute(backend.build(&stmt))
                .await
                .expect("create table");
        }
        db
    }
}
