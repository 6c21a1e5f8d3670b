//! Relational store adapter.
//!
//! Rows travel as JSON [`Record`]s keyed by field name; storage names come
//! from [`EntityMeta`]. Every operation takes an already-built `Condition`
//! (compiled filter plus injected scope) and runs on any `ConnectionTrait`,
//! so callers choose between a pooled connection and a transaction.

use sea_orm::sea_query::{
    Alias, Asterisk, ConditionalStatement, Expr, Order, Query, SimpleExpr,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction,
    FromQueryResult, JsonValue, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::cond::json_to_sea_value;
use crate::config::ConnectOpts;
use crate::error::DbError;
use crate::metadata::EntityMeta;

/// A row as a JSON object keyed by field name.
pub type Record = serde_json::Map<String, JsonValue>;

/// Pagination of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Page {
    pub offset: u64,
    /// `None` applies the configured default.
    pub limit: Option<u64>,
    /// Also compute the total number of matching rows.
    pub with_total: bool,
}

/// Pooled database handle.
#[derive(Debug, Clone)]
pub struct Db {
    conn: DatabaseConnection,
}

impl Db {
    /// Connect to `url`.
    ///
    /// In-memory `SQLite` databases are private to one connection, so their
    /// pool is pinned to a single connection unless `max_conns` says otherwise.
    ///
    /// # Errors
    /// Returns [`DbError::Sea`] if the connection cannot be established.
    pub async fn connect(url: &str, opts: ConnectOpts) -> Result<Self, DbError> {
        if url.trim().is_empty() {
            return Err(DbError::UnsupportedUrl(url.to_owned()));
        }
        let in_memory = url.starts_with("sqlite") && url.contains("memory");
        let mut options = ConnectOptions::new(url.to_owned());
        options.sqlx_logging(opts.sqlx_logging);
        match (opts.max_conns, in_memory) {
            (Some(max), _) => {
                options.max_connections(max);
            }
            (None, true) => {
                options.max_connections(1).min_connections(1);
            }
            (None, false) => {}
        }
        if let Some(min) = opts.min_conns {
            options.min_connections(min);
        }
        if let Some(timeout) = opts.acquire_timeout {
            options.acquire_timeout(timeout);
        }

        let conn = Database::connect(options).await?;
        tracing::info!(backend = ?conn.get_database_backend(), "database connected");
        Ok(Self { conn })
    }

    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// # Errors
    /// Returns [`DbError::Sea`] if the transaction cannot be started.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbError> {
        Ok(self.conn.begin().await?)
    }
}

/// Map record entries to `(column, value)` pairs; fields without storage are
/// dropped.
fn record_columns(meta: &EntityMeta, record: &Record) -> Vec<(String, sea_orm::Value)> {
    record
        .iter()
        .filter_map(|(name, value)| match meta.column_of(name) {
            Some(col) => Some((col.to_owned(), json_to_sea_value(value))),
            None => {
                tracing::debug!(entity = meta.name(), field = %name, "record field without storage dropped");
                None
            }
        })
        .collect()
}

/// Select rows matching `cond`, ordered by primary key.
///
/// # Errors
/// Returns [`DbError::Sea`] on query failure.
pub async fn select_rows<C: ConnectionTrait>(
    conn: &C,
    meta: &EntityMeta,
    cond: sea_orm::Condition,
    offset: u64,
    limit: Option<u64>,
) -> Result<Vec<Record>, DbError> {
    let table = Alias::new(meta.table());
    let mut stmt = Query::select();
    for field in meta.stored_fields() {
        stmt.expr_as(
            Expr::col((table.clone(), Alias::new(&field.column))),
            Alias::new(&field.name),
        );
    }
    stmt.from(table.clone())
        .cond_where(cond)
        .order_by((table, Alias::new(&meta.primary_key().column)), Order::Asc);
    if let Some(limit) = limit {
        stmt.limit(limit);
    }
    if offset > 0 {
        stmt.offset(offset);
    }

    let rows = JsonValue::find_by_statement(conn.get_database_backend().build(&stmt))
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            JsonValue::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

/// Count rows matching `cond`.
///
/// # Errors
/// Returns [`DbError::Sea`] on query failure.
pub async fn count_rows<C: ConnectionTrait>(
    conn: &C,
    meta: &EntityMeta,
    cond: sea_orm::Condition,
) -> Result<u64, DbError> {
    let stmt = Query::select()
        .expr_as(Expr::col(Asterisk).count(), Alias::new("total"))
        .from(Alias::new(meta.table()))
        .cond_where(cond)
        .to_owned();
    let Some(row) = conn.query_one(conn.get_database_backend().build(&stmt)).await? else {
        return Ok(0);
    };
    let total: i64 = row.try_get("", "total")?;
    Ok(u64::try_from(total).unwrap_or_default())
}

/// Insert one record.
///
/// # Errors
/// Returns [`DbError::InvalidRecord`] if no field of the record is stored,
/// [`DbError::Sea`] on statement failure.
pub async fn insert_row<C: ConnectionTrait>(
    conn: &C,
    meta: &EntityMeta,
    record: &Record,
) -> Result<u64, DbError> {
    let cols = record_columns(meta, record);
    if cols.is_empty() {
        return Err(DbError::InvalidRecord(format!(
            "no stored field of '{}' in record",
            meta.name()
        )));
    }
    let mut stmt = Query::insert();
    stmt.into_table(Alias::new(meta.table()))
        .columns(cols.iter().map(|(c, _)| Alias::new(c)));
    stmt.values(cols.into_iter().map(|(_, v)| SimpleExpr::from(v)))?;

    let res = conn.execute(conn.get_database_backend().build(&stmt)).await?;
    Ok(res.rows_affected())
}

/// Apply `changes` to every row matching `cond`.
///
/// # Errors
/// Returns [`DbError::InvalidRecord`] if no change maps to a column,
/// [`DbError::Sea`] on statement failure.
pub async fn update_rows<C: ConnectionTrait>(
    conn: &C,
    meta: &EntityMeta,
    changes: &Record,
    cond: sea_orm::Condition,
) -> Result<u64, DbError> {
    let cols = record_columns(meta, changes);
    if cols.is_empty() {
        return Err(DbError::InvalidRecord(format!(
            "no stored field of '{}' in changes",
            meta.name()
        )));
    }
    let mut stmt = Query::update();
    stmt.table(Alias::new(meta.table()));
    for (col, value) in cols {
        stmt.value(Alias::new(col), value);
    }
    stmt.cond_where(cond);

    let res = conn.execute(conn.get_database_backend().build(&stmt)).await?;
    Ok(res.rows_affected())
}

/// Delete every row matching `cond`.
///
/// # Errors
/// Returns [`DbError::Sea`] on statement failure.
pub async fn delete_rows<C: ConnectionTrait>(
    conn: &C,
    meta: &EntityMeta,
    cond: sea_orm::Condition,
) -> Result<u64, DbError> {
    let stmt = Query::delete()
        .from_table(Alias::new(meta.table()))
        .cond_where(cond)
        .to_owned();
    let res = conn.execute(conn.get_database_backend().build(&stmt)).await?;
    Ok(res.rows_affected())
}
