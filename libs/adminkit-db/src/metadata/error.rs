use thiserror::Error;

use super::FieldTag;

/// Errors raised while populating or validating the metadata registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("entity '{0}' is already registered")]
    DuplicateEntity(String),

    #[error("entity '{entity}' declares field '{field}' more than once")]
    DuplicateField { entity: String, field: String },

    #[error("entity '{entity}' tags more than one field as {tag:?}")]
    DuplicateTag { entity: String, tag: FieldTag },

    #[error("entity '{0}' has no primary key field")]
    MissingPrimaryKey(String),

    #[error("field '{entity}.{field}' references unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        field: String,
        target: String,
    },

    #[error("relation '{entity}.{field}' uses unknown key '{key}'")]
    UnknownKey {
        entity: String,
        field: String,
        key: String,
    },

    #[error("many-to-many relation '{entity}.{field}' has no join table")]
    MissingJoinTable { entity: String, field: String },
}
