//! Error type for `inat-client`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("GET {url} → {status}")]
  Status {
    url:    String,
    status: reqwest::StatusCode,
  },

  #[error("observation without a numeric id (page below {id_below:?})")]
  MissingId { id_below: Option<i64> },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
