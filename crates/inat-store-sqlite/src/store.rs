//! [`SqliteStore`] — the SQLite implementation of [`ObservationStore`].

use std::path::Path;

use inat_core::{
  store::{ObservationStore, Write},
  table::{ColumnType, Key, Row, Table, TableSchema, View},
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{decode_value, encode_value, quote_ident},
  schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An observation store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    self
      .with_conn(|conn| {
        conn.execute_batch(schema::PRAGMAS)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the connection thread, passing domain errors through intact.
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| Ok::<_, tokio_rusqlite::Error>(f(conn)))
      .await?
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Column names of `table` in declaration order; empty if it does not exist.
  pub async fn columns(&self, table: Table) -> Result<Vec<String>> {
    self
      .with_conn(move |conn| table_columns(conn, table.name()))
      .await
  }

  /// Number of rows in `table`; zero if it does not exist.
  pub async fn count(&self, table: Table) -> Result<u64> {
    self
      .with_conn(move |conn| {
        if table_columns(conn, table.name())?.is_empty() {
          return Ok(0);
        }
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table.name()));
        let count: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
      })
      .await
  }

  /// Fetch the stored row with primary key `key`, every column included.
  pub async fn get_row(&self, table: Table, key: Key) -> Result<Option<Row>> {
    self
      .with_conn(move |conn| {
        let schema = table.schema();
        if table_columns(conn, schema.name)?.is_empty() {
          return Ok(None);
        }
        let params = key
          .parts()
          .iter()
          .map(encode_value)
          .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&schema::select_by_key(schema))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let row = stmt
          .query_row(rusqlite::params_from_iter(params), |r| {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
              row.insert(name.clone(), decode_value(r.get_ref(i)?));
            }
            Ok(row)
          })
          .optional()?;
        Ok(row)
      })
      .await
  }
}

// ─── ObservationStore impl ───────────────────────────────────────────────────

impl ObservationStore for SqliteStore {
  type Error = Error;

  async fn upsert(&self, table: Table, row: Row) -> Result<Key> {
    self
      .with_conn(move |conn| upsert_row(conn, table, &row))
      .await
  }

  async fn apply(&self, writes: Vec<Write>) -> Result<Vec<Key>> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let mut keys = Vec::with_capacity(writes.len());
        for write in &writes {
          match write {
            Write::EnsureTable(table) => ensure_table(&tx, *table)?,
            Write::Upsert { table, row } => keys.push(upsert_row(&tx, *table, row)?),
          }
        }
        tx.commit()?;
        Ok(keys)
      })
      .await
  }

  async fn ensure_table(&self, table: Table) -> Result<()> {
    self
      .with_conn(move |conn| ensure_table(conn, table))
      .await
  }

  async fn create_view_if_absent(&self, view: &'static View) -> Result<bool> {
    self
      .with_conn(move |conn| {
        let exists: bool = conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'view' AND name = ?1)",
          [view.name],
          |r| r.get(0),
        )?;
        if exists {
          return Ok(false);
        }

        let sql = format!("CREATE VIEW {} AS {}", quote_ident(view.name), view.query);
        match conn.execute_batch(&sql) {
          Ok(()) => {
            tracing::debug!(view = view.name, "created view");
            Ok(true)
          }
          Err(e) if e.to_string().contains("already exists") => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await
  }
}

// ─── Connection-thread helpers ───────────────────────────────────────────────

fn table_columns(conn: &rusqlite::Connection, table: &str) -> Result<Vec<String>> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
  let columns = stmt
    .query_map([], |r| r.get::<_, String>(1))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(columns)
}

fn ensure_table(conn: &rusqlite::Connection, table: Table) -> Result<()> {
  let schema = table.schema();
  if table_columns(conn, schema.name)?.is_empty() {
    tracing::debug!(table = schema.name, "creating table");
    conn.execute_batch(&schema::create_table(schema, &[]))?;
  }
  Ok(())
}

/// Create or widen `schema`'s table so it can hold every field of `row`.
fn prepare_table(conn: &rusqlite::Connection, schema: &TableSchema, row: &Row) -> Result<()> {
  let existing = table_columns(conn, schema.name)?;

  if existing.is_empty() {
    let extra: Vec<(&str, ColumnType)> = row
      .iter()
      .filter(|(name, _)| schema.column(name).is_none())
      .map(|(name, value)| (name.as_str(), ColumnType::infer(value)))
      .collect();
    tracing::debug!(table = schema.name, passthrough = extra.len(), "creating table");
    conn.execute_batch(&schema::create_table(schema, &extra))?;
    return Ok(());
  }

  let missing: Vec<(&String, &serde_json::Value)> = row
    .iter()
    .filter(|(name, _)| !existing.iter().any(|c| c == *name))
    .collect();
  if missing.is_empty() {
    return Ok(());
  }
  if !schema.widen {
    return Err(Error::SchemaLocked {
      table:   schema.name,
      columns: missing.into_iter().map(|(name, _)| name.clone()).collect(),
    });
  }

  for (name, value) in missing {
    let ty = schema
      .column(name)
      .map_or_else(|| ColumnType::infer(value), |c| c.ty);
    tracing::info!(table = schema.name, column = %name, ty = ty.sql(), "adding column");
    conn.execute(&schema::add_column(schema.name, name, ty), [])?;
  }
  Ok(())
}

fn upsert_row(conn: &rusqlite::Connection, table: Table, row: &Row) -> Result<Key> {
  let schema = table.schema();
  let key = schema
    .key_of(row)
    .ok_or(Error::MissingKey { table: schema.name })?;

  prepare_table(conn, schema, row)?;

  let columns: Vec<&str> = row.keys().map(String::as_str).collect();
  let params = row
    .values()
    .map(encode_value)
    .collect::<Result<Vec<_>>>()?;
  conn
    .prepare_cached(&schema::upsert(schema, &columns))?
    .execute(rusqlite::params_from_iter(params))?;

  Ok(key)
}
