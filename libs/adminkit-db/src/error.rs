use thiserror::Error;

/// Errors from the relational store adapter.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error("query build error: {0}")]
    Query(#[from] sea_orm::sea_query::error::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),
}
