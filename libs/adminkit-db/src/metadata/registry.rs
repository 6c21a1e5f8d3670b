use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::descriptor::{DescribeEntity, EntityDescriptor, FieldTag, Relation, RelationKind};
use super::error::MetadataError;

/// Indexed field description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: String,
    /// Storage column name.
    pub column: String,
    pub tags: Vec<FieldTag>,
    pub relation: Option<Relation>,
}

impl FieldMeta {
    #[must_use]
    pub fn has_tag(&self, tag: FieldTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Relationship fields are virtual; everything else maps to a column.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.relation.is_none()
    }
}

/// Durable, indexed description of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMeta {
    name: String,
    table: String,
    unrestricted: bool,
    fields: Vec<FieldMeta>,
    by_name: HashMap<String, usize>,
    by_tag: HashMap<FieldTag, usize>,
}

impl EntityMeta {
    /// Index a descriptor.
    ///
    /// # Errors
    /// Returns [`MetadataError`] on duplicate field names, a singular tag
    /// carried by more than one field, or a missing primary key.
    pub fn from_descriptor(desc: EntityDescriptor) -> Result<Self, MetadataError> {
        let table = desc.table_name().to_owned();
        let mut fields = Vec::with_capacity(desc.fields.len());
        let mut by_name = HashMap::new();
        let mut by_tag = HashMap::new();

        for (idx, fd) in desc.fields.into_iter().enumerate() {
            if by_name.insert(fd.name.clone(), idx).is_some() {
                return Err(MetadataError::DuplicateField {
                    entity: desc.name,
                    field: fd.name,
                });
            }
            for tag in fd.tags.iter().copied().filter(|t| t.is_singular()) {
                if by_tag.insert(tag, idx).is_some() {
                    return Err(MetadataError::DuplicateTag {
                        entity: desc.name,
                        tag,
                    });
                }
            }
            fields.push(FieldMeta {
                column: fd.storage_name.unwrap_or_else(|| fd.name.clone()),
                name: fd.name,
                tags: fd.tags,
                relation: fd.relation,
            });
        }

        if !by_tag.contains_key(&FieldTag::PrimaryKey) {
            return Err(MetadataError::MissingPrimaryKey(desc.name));
        }

        Ok(Self {
            name: desc.name,
            table,
            unrestricted: desc.unrestricted,
            fields,
            by_name,
            by_tag,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|f| f.is_stored())
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Field carrying a singular tag.
    #[must_use]
    pub fn tagged(&self, tag: FieldTag) -> Option<&FieldMeta> {
        self.by_tag.get(&tag).map(|&i| &self.fields[i])
    }

    /// Construction rejects entities without a primary key.
    #[must_use]
    pub fn primary_key(&self) -> &FieldMeta {
        let idx = self.by_tag.get(&FieldTag::PrimaryKey).copied().unwrap_or(0);
        &self.fields[idx]
    }

    pub fn secret_fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|f| f.has_tag(FieldTag::Secret))
    }

    /// Storage column of a stored field.
    #[must_use]
    pub fn column_of(&self, field: &str) -> Option<&str> {
        self.field(field)
            .filter(|f| f.is_stored())
            .map(|f| f.column.as_str())
    }
}

/// Registry of all known entities, keyed by entity name.
#[derive(Debug, Default, Clone)]
pub struct MetadataRegistry {
    entities: BTreeMap<String, Arc<EntityMeta>>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a Rust type implementing [`DescribeEntity`].
    ///
    /// # Errors
    /// See [`MetadataRegistry::register_descriptor`].
    pub fn register<E: DescribeEntity>(&mut self) -> Result<Arc<EntityMeta>, MetadataError> {
        self.register_descriptor(E::describe())
    }

    /// Register a declarative descriptor.
    ///
    /// # Errors
    /// Returns [`MetadataError::DuplicateEntity`] if the name is taken, or any
    /// indexing error from [`EntityMeta::from_descriptor`].
    pub fn register_descriptor(
        &mut self,
        desc: EntityDescriptor,
    ) -> Result<Arc<EntityMeta>, MetadataError> {
        if self.entities.contains_key(&desc.name) {
            return Err(MetadataError::DuplicateEntity(desc.name));
        }
        let meta = Arc::new(EntityMeta::from_descriptor(desc)?);
        self.entities
            .insert(meta.name().to_owned(), Arc::clone(&meta));
        tracing::debug!(entity = meta.name(), table = meta.table(), "entity registered");
        Ok(meta)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<EntityMeta>> {
        self.entities.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Cross-entity validation: every relation target exists and every
    /// relation key names a stored field on the correct side.
    ///
    /// # Errors
    /// Returns the first [`MetadataError`] found.
    pub fn validate(&self) -> Result<(), MetadataError> {
        for meta in self.entities.values() {
            for field in meta.fields() {
                let Some(rel) = &field.relation else {
                    continue;
                };
                let target = self
                    .entities
                    .get(&rel.target)
                    .ok_or_else(|| MetadataError::UnknownTarget {
                        entity: meta.name().to_owned(),
                        field: field.name.clone(),
                        target: rel.target.clone(),
                    })?;
                let unknown_key = |key: &str| MetadataError::UnknownKey {
                    entity: meta.name().to_owned(),
                    field: field.name.clone(),
                    key: key.to_owned(),
                };
                if meta.column_of(&rel.local_key).is_none() {
                    return Err(unknown_key(&rel.local_key));
                }
                if target.column_of(&rel.foreign_key).is_none() {
                    return Err(unknown_key(&rel.foreign_key));
                }
                if rel.kind == RelationKind::ManyToMany && rel.join.is_none() {
                    return Err(MetadataError::MissingJoinTable {
                        entity: meta.name().to_owned(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
