//! The `ObservationStore` trait and the write operations it applies.
//!
//! The trait is implemented by storage backends (e.g. `inat-store-sqlite`).
//! The normalizer and the importer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::table::{Key, Row, Table, View};

// ─── Writes ──────────────────────────────────────────────────────────────────

/// A single step of a write plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
  /// Create `table` with its minimal schema unless it already exists.
  EnsureTable(Table),
  /// Insert `row`, or overwrite the columns it names if its key is taken.
  Upsert { table: Table, row: Row },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a relational backend for normalized observation data.
///
/// Upserts are keyed by the table's primary key as declared in the
/// [`Table`] catalogue. Tables are created on first write and widened with new
/// columns when a row carries fields the table has not seen, if the table
/// allows it. Columns are never dropped.
pub trait ObservationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Upsert one row and return its primary key.
  fn upsert(
    &self,
    table: Table,
    row: Row,
  ) -> impl Future<Output = Result<Key, Self::Error>> + Send + '_;

  /// Apply `writes` in order, atomically. Returns the key of every upsert,
  /// in order.
  fn apply(
    &self,
    writes: Vec<Write>,
  ) -> impl Future<Output = Result<Vec<Key>, Self::Error>> + Send + '_;

  /// Create `table` with its minimal schema if it does not exist yet.
  fn ensure_table(
    &self,
    table: Table,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Create `view` unless a view of that name already exists. Returns whether
  /// the view was created by this call.
  fn create_view_if_absent(
    &self,
    view: &'static View,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
