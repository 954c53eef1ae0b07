//! The relational table catalogue.
//!
//! Each [`Table`] maps to a static [`TableSchema`] describing its primary key,
//! foreign keys, the columns that always exist (in display order), and whether
//! unseen passthrough fields may widen it.

use std::fmt;

use serde_json::Value;

/// A row as handed to the store: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// The primary key of a stored row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
  Integer(i64),
  Text(String),
  /// Multi-column keys, in [`TableSchema::primary_key`] order.
  Composite(Vec<Key>),
}

impl Key {
  /// Interpret a single column value as a key. Floats, booleans, nulls and
  /// nested values are not keys.
  pub fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Number(n) => n.as_i64().map(Key::Integer),
      Value::String(s) => Some(Key::Text(s.clone())),
      _ => None,
    }
  }

  pub fn to_value(&self) -> Value {
    match self {
      Key::Integer(i) => Value::from(*i),
      Key::Text(s) => Value::from(s.as_str()),
      Key::Composite(parts) => Value::Array(parts.iter().map(Key::to_value).collect()),
    }
  }

  /// The individual column values, one per primary-key column.
  pub fn parts(&self) -> Vec<Value> {
    match self {
      Key::Composite(parts) => parts.iter().map(Key::to_value).collect(),
      single => vec![single.to_value()],
    }
  }
}

impl From<i64> for Key {
  fn from(id: i64) -> Self { Key::Integer(id) }
}

impl From<&str> for Key {
  fn from(s: &str) -> Self { Key::Text(s.to_owned()) }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Key::Integer(i) => write!(f, "{i}"),
      Key::Text(s) => write!(f, "{s}"),
      Key::Composite(parts) => {
        let parts: Vec<String> = parts.iter().map(Key::to_string).collect();
        write!(f, "({})", parts.join(", "))
      }
    }
  }
}

// ─── Schema description ──────────────────────────────────────────────────────

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
  Integer,
  Float,
  Text,
}

impl ColumnType {
  pub fn sql(self) -> &'static str {
    match self {
      ColumnType::Integer => "INTEGER",
      ColumnType::Float => "FLOAT",
      ColumnType::Text => "TEXT",
    }
  }

  /// Conservative storage class for a passthrough value: nulls, strings and
  /// nested JSON are stored as text.
  pub fn infer(value: &Value) -> Self {
    match value {
      Value::Bool(_) => ColumnType::Integer,
      Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Integer,
      Value::Number(_) => ColumnType::Float,
      _ => ColumnType::Text,
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub name: &'static str,
  pub ty:   ColumnType,
}

impl Column {
  pub const fn new(name: &'static str, ty: ColumnType) -> Self { Self { name, ty } }
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
  pub column:     &'static str,
  pub table:      Table,
  pub references: &'static str,
}

impl ForeignKey {
  pub const fn new(column: &'static str, table: Table, references: &'static str) -> Self {
    Self { column, table, references }
  }
}

#[derive(Debug)]
pub struct TableSchema {
  pub name:         &'static str,
  pub primary_key:  &'static [&'static str],
  /// Columns created with the table, in display order. Every primary and
  /// foreign key column is listed here.
  pub columns:      &'static [Column],
  pub foreign_keys: &'static [ForeignKey],
  /// Whether unseen fields may add columns.
  pub widen:        bool,
}

impl TableSchema {
  /// Extract the primary key of `row`, or `None` if a key column is missing
  /// or not key-shaped.
  pub fn key_of(&self, row: &Row) -> Option<Key> {
    let mut parts = self
      .primary_key
      .iter()
      .map(|col| row.get(*col).and_then(Key::from_value))
      .collect::<Option<Vec<_>>>()?;
    if parts.len() == 1 {
      parts.pop()
    } else {
      Some(Key::Composite(parts))
    }
  }

  pub fn column(&self, name: &str) -> Option<&Column> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn is_primary_key(&self, name: &str) -> bool {
    self.primary_key.contains(&name)
  }
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Users,
  Photos,
  ConservationStatus,
  Taxons,
  Observations,
  Identifications,
  ObservationsPhotos,
}

impl Table {
  pub const ALL: [Table; 7] = [
    Table::Users,
    Table::Photos,
    Table::ConservationStatus,
    Table::Taxons,
    Table::Observations,
    Table::Identifications,
    Table::ObservationsPhotos,
  ];

  pub fn schema(self) -> &'static TableSchema {
    match self {
      Table::Users => &USERS,
      Table::Photos => &PHOTOS,
      Table::ConservationStatus => &CONSERVATION_STATUS,
      Table::Taxons => &TAXONS,
      Table::Observations => &OBSERVATIONS,
      Table::Identifications => &IDENTIFICATIONS,
      Table::ObservationsPhotos => &OBSERVATIONS_PHOTOS,
    }
  }

  pub fn name(self) -> &'static str { self.schema().name }
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

use ColumnType::{Integer, Text};

pub static USERS: TableSchema = TableSchema {
  name:         "users",
  primary_key:  &["id"],
  columns:      &[
    Column::new("id", Integer),
    Column::new("login", Text),
    Column::new("name", Text),
  ],
  foreign_keys: &[],
  widen:        true,
};

pub static PHOTOS: TableSchema = TableSchema {
  name:         "photos",
  primary_key:  &["id"],
  columns:      &[
    Column::new("id", Integer),
    Column::new("url", Text),
    Column::new("medium_url", Text),
    Column::new("width", Integer),
    Column::new("height", Integer),
  ],
  foreign_keys: &[],
  widen:        true,
};

pub static CONSERVATION_STATUS: TableSchema = TableSchema {
  name:         "conservation_status",
  primary_key:  &["status_name"],
  columns:      &[Column::new("status_name", Text)],
  foreign_keys: &[],
  widen:        true,
};

pub static TAXONS: TableSchema = TableSchema {
  name:         "taxons",
  primary_key:  &["id"],
  columns:      &[
    Column::new("id", Integer),
    Column::new("name", Text),
    Column::new("preferred_common_name", Text),
    Column::new("rank", Text),
    Column::new("default_photo", Integer),
    Column::new("conservation_status", Text),
  ],
  foreign_keys: &[
    ForeignKey::new("default_photo", Table::Photos, "id"),
    ForeignKey::new("conservation_status", Table::ConservationStatus, "status_name"),
  ],
  widen:        true,
};

pub static OBSERVATIONS: TableSchema = TableSchema {
  name:         "observations",
  primary_key:  &["id"],
  columns:      &[
    Column::new("id", Integer),
    Column::new("taxon", Integer),
    Column::new("user", Integer),
    Column::new("latitude", Text),
    Column::new("longitude", Text),
  ],
  foreign_keys: &[
    ForeignKey::new("taxon", Table::Taxons, "id"),
    ForeignKey::new("user", Table::Users, "id"),
  ],
  widen:        true,
};

pub static IDENTIFICATIONS: TableSchema = TableSchema {
  name:         "identifications",
  primary_key:  &["id"],
  columns:      &[
    Column::new("id", Integer),
    Column::new("user", Integer),
    Column::new("observation", Integer),
    Column::new("created_at", Text),
    Column::new("taxon", Integer),
    Column::new("previous_observation_taxon", Integer),
  ],
  foreign_keys: &[
    ForeignKey::new("user", Table::Users, "id"),
    ForeignKey::new("taxon", Table::Taxons, "id"),
    ForeignKey::new("observation", Table::Observations, "id"),
    ForeignKey::new("previous_observation_taxon", Table::Taxons, "id"),
  ],
  widen:        true,
};

pub static OBSERVATIONS_PHOTOS: TableSchema = TableSchema {
  name:         "observations_photos",
  primary_key:  &["observations_id", "photos_id"],
  columns:      &[
    Column::new("observations_id", Integer),
    Column::new("photos_id", Integer),
  ],
  foreign_keys: &[
    ForeignKey::new("observations_id", Table::Observations, "id"),
    ForeignKey::new("photos_id", Table::Photos, "id"),
  ],
  widen:        false,
};

// ─── Views ───────────────────────────────────────────────────────────────────

/// A derived view, created once the tables it reads from exist.
#[derive(Debug)]
pub struct View {
  pub name:       &'static str,
  pub query:      &'static str,
  pub depends_on: &'static [Table],
}

pub static OBSERVATIONS_WITH_PHOTOS: View = View {
  name:       "observations_with_photos",
  query:      "SELECT
    photos.medium_url AS photo,
    observations.*
  FROM observations
  JOIN observations_photos ON observations_photos.observations_id = observations.id
  JOIN photos ON photos.id = observations_photos.photos_id",
  depends_on: &[Table::Observations, Table::ObservationsPhotos, Table::Photos],
};

pub static VIEWS: &[&View] = &[&OBSERVATIONS_WITH_PHOTOS];
