//! SQL generation for the dynamic schema.
//!
//! Tables are created from their catalogue entry plus whatever passthrough
//! columns the first row brings. Later rows may add columns with
//! `ALTER TABLE … ADD COLUMN`; nothing is ever dropped.

use inat_core::table::{ColumnType, TableSchema};

use crate::encode::quote_ident;

/// Connection setup. Foreign keys are declared on every table but not
/// enforced, so a nullable reference never requires its target table to
/// exist yet.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = OFF;
";

/// `CREATE TABLE` for `schema`, with `extra` passthrough columns appended
/// after the catalogue columns.
pub fn create_table(schema: &TableSchema, extra: &[(&str, ColumnType)]) -> String {
  let mut defs: Vec<String> = schema
    .columns
    .iter()
    .map(|c| (c.name, c.ty))
    .chain(extra.iter().copied())
    .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
    .collect();

  defs.push(format!("PRIMARY KEY ({})", column_list(schema.primary_key)));
  for fk in schema.foreign_keys {
    defs.push(format!(
      "FOREIGN KEY ({}) REFERENCES {}({})",
      quote_ident(fk.column),
      quote_ident(fk.table.name()),
      quote_ident(fk.references),
    ));
  }

  format!(
    "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
    quote_ident(schema.name),
    defs.join(",\n    ")
  )
}

pub fn add_column(table: &str, column: &str, ty: ColumnType) -> String {
  format!(
    "ALTER TABLE {} ADD COLUMN {} {}",
    quote_ident(table),
    quote_ident(column),
    ty.sql()
  )
}

/// Insert `columns`, or overwrite the non-key ones when the primary key is
/// already present. Columns not named keep their stored values.
pub fn upsert(schema: &TableSchema, columns: &[&str]) -> String {
  let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
  let updates: Vec<String> = columns
    .iter()
    .filter(|c| !schema.is_primary_key(c))
    .map(|c| format!("{0} = excluded.{0}", quote_ident(c)))
    .collect();

  let action = if updates.is_empty() {
    "NOTHING".to_owned()
  } else {
    format!("UPDATE SET {}", updates.join(", "))
  };

  format!(
    "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO {}",
    quote_ident(schema.name),
    column_list(columns),
    placeholders.join(", "),
    column_list(schema.primary_key),
    action
  )
}

/// `SELECT *` for the row whose primary key columns equal `?1..?n`.
pub fn select_by_key(schema: &TableSchema) -> String {
  let conditions: Vec<String> = schema
    .primary_key
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
    .collect();
  format!(
    "SELECT * FROM {} WHERE {}",
    quote_ident(schema.name),
    conditions.join(" AND ")
  )
}

fn column_list(columns: &[&str]) -> String {
  columns
    .iter()
    .map(|c| quote_ident(c))
    .collect::<Vec<_>>()
    .join(", ")
}
