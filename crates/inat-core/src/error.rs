//! Error types for `inat-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A raw record could not be decoded into the shape the normalizer needs,
  /// e.g. an identification without a `taxon`.
  #[error("malformed record: {0}")]
  Malformed(#[from] serde_json::Error),

  #[error("{table} row has no usable primary key column `{column}`")]
  MissingKey {
    table:  &'static str,
    column: &'static str,
  },

  #[error("location {0:?} is not a \"lat,lon\" pair")]
  BadLocation(String),

  #[error("taxon ancestry nested deeper than {0} levels")]
  AncestryTooDeep(usize),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
