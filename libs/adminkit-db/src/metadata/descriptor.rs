use serde::{Deserialize, Serialize};

/// Declared relationship kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// This entity holds the id of exactly one target row (`local_key -> target.foreign_key`).
    OwnedReference,
    /// Target rows hold this entity's id (`local_key <- target.foreign_key`).
    OneToMany,
    /// Rows are linked through a join table.
    ManyToMany,
}

/// Join table of a many-to-many relationship. Keys are storage column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinTable {
    pub table: String,
    /// Column referencing the owning entity's `local_key`.
    pub source_key: String,
    /// Column referencing the target entity's `foreign_key`.
    pub target_key: String,
}

fn default_key() -> String {
    "id".to_owned()
}

/// Relationship carried by a field.
///
/// `local_key` names a field of the owning entity and `foreign_key` a field of
/// the target entity; both default to `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Relation {
    pub kind: RelationKind,
    pub target: String,
    #[serde(default = "default_key")]
    pub local_key: String,
    #[serde(default = "default_key")]
    pub foreign_key: String,
    #[serde(default)]
    pub join: Option<JoinTable>,
}

impl Relation {
    /// `local_key` on this entity references `target.id`.
    #[must_use]
    pub fn owned_reference(target: impl Into<String>, local_key: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::OwnedReference,
            target: target.into(),
            local_key: local_key.into(),
            foreign_key: default_key(),
            join: None,
        }
    }

    /// `target.foreign_key` references this entity's id.
    #[must_use]
    pub fn one_to_many(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::OneToMany,
            target: target.into(),
            local_key: default_key(),
            foreign_key: foreign_key.into(),
            join: None,
        }
    }

    #[must_use]
    pub fn many_to_many(
        target: impl Into<String>,
        table: impl Into<String>,
        source_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::ManyToMany,
            target: target.into(),
            local_key: default_key(),
            foreign_key: default_key(),
            join: Some(JoinTable {
                table: table.into(),
                source_key: source_key.into(),
                target_key: target_key.into(),
            }),
        }
    }
}

/// Semantic tag attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTag {
    PrimaryKey,
    /// Holds the owning organization id, as hyphenated text.
    OwnerOrg,
    /// Holds the creator/owner principal id, as hyphenated text.
    Owner,
    /// Holds the id of the last principal that modified the row.
    LastModifier,
    /// Redacted from query results.
    Secret,
    /// Deletion timestamp; rows with a value are treated as deleted.
    SoftDelete,
}

impl FieldTag {
    /// Singular tags may be carried by at most one field per entity.
    #[must_use]
    pub fn is_singular(self) -> bool {
        !matches!(self, Self::Secret)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDescriptor {
    pub name: String,
    /// Storage column; defaults to `name`.
    #[serde(default)]
    pub storage_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<FieldTag>,
    #[serde(default)]
    pub relation: Option<Relation>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_name: None,
            tags: Vec::new(),
            relation: None,
        }
    }

    #[must_use]
    pub fn storage(mut self, column: impl Into<String>) -> Self {
        self.storage_name = Some(column.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: FieldTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }
}

/// Declarative description of one entity.
///
/// # Example
///
/// ```
/// use adminkit_db::metadata::{EntityDescriptor, FieldDescriptor, FieldTag, Relation};
///
/// let user = EntityDescriptor::new("user")
///     .table("users")
///     .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
///     .field(FieldDescriptor::new("org_id").tag(FieldTag::OwnerOrg))
///     .field(FieldDescriptor::new("dept_id"))
///     .field(FieldDescriptor::new("dept").relation(Relation::owned_reference("dept", "dept_id")));
/// assert_eq!(user.table_name(), "users");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDescriptor {
    pub name: String,
    /// Storage table; defaults to `name`.
    #[serde(default)]
    pub table: Option<String>,
    /// Global entity that is never row-scoped.
    #[serde(default)]
    pub unrestricted: bool,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            unrestricted: false,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn unrestricted(mut self) -> Self {
        self.unrestricted = true;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }
}

/// Capability implemented by Rust types that describe themselves as entities.
///
/// ```
/// use adminkit_db::metadata::{DescribeEntity, EntityDescriptor, FieldDescriptor, FieldTag};
///
/// struct Department;
///
/// impl DescribeEntity for Department {
///     fn describe() -> EntityDescriptor {
///         EntityDescriptor::new("dept")
///             .field(FieldDescriptor::new("id").tag(FieldTag::PrimaryKey))
///             .field(FieldDescriptor::new("name"))
///     }
/// }
/// ```
pub trait DescribeEntity {
    fn describe() -> EntityDescriptor;
}
