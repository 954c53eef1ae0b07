//! Error type for `inat-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The row carries fields the table does not have and may not gain.
  #[error("table {table} does not accept new columns: {columns:?}")]
  SchemaLocked {
    table:   &'static str,
    columns: Vec<String>,
  },

  #[error("{table} row has no usable primary key")]
  MissingKey { table: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
