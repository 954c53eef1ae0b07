//! Cursor pagination over a user's observations, newest first.
//!
//! Offset pagination is unreliable for large result sets, so each request
//! asks for ids below the smallest id seen so far. The API treats `id_below`
//! as exclusive, so no record is fetched twice.

use std::{collections::VecDeque, future::Future};

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// Records requested per page.
pub const PAGE_SIZE: u32 = 30;

// ─── Wire types ──────────────────────────────────────────────────────────────

/// Parameters of one listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
  pub user_login: String,
  pub id_below:   Option<i64>,
}

impl PageQuery {
  pub fn new(user_login: impl Into<String>) -> Self {
    Self {
      user_login: user_login.into(),
      id_below:   None,
    }
  }

  /// Query-string pairs in request order.
  pub fn params(&self) -> Vec<(&'static str, String)> {
    let mut params = vec![
      ("user_login", self.user_login.clone()),
      ("order", "desc".to_owned()),
      ("order_by", "id".to_owned()),
      ("per_page", PAGE_SIZE.to_string()),
    ];
    if let Some(id) = self.id_below {
      params.push(("id_below", id.to_string()));
    }
    params
  }
}

/// Body of `GET /observations`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservationPage {
  #[serde(default)]
  pub total_results: u64,
  #[serde(default)]
  pub results:       Vec<Value>,
}

/// Anything that can answer a listing request.
pub trait PageSource: Send + Sync {
  fn fetch_page<'a>(
    &'a self,
    query: &'a PageQuery,
  ) -> impl Future<Output = Result<ObservationPage>> + Send + 'a;
}

// ─── Paginator ───────────────────────────────────────────────────────────────

/// Lazily walks every observation of one user.
///
/// Pages are fetched only when the buffered records run out. Any fetch error
/// is returned once from [`next`](Self::next) and ends the walk.
pub struct Paginator<S> {
  source:        S,
  query:         PageQuery,
  buffer:        VecDeque<Value>,
  total_results: Option<u64>,
  done:          bool,
}

impl<S: PageSource> Paginator<S> {
  pub fn new(source: S, user_login: impl Into<String>) -> Self {
    Self {
      source,
      query: PageQuery::new(user_login),
      buffer: VecDeque::new(),
      total_results: None,
      done: false,
    }
  }

  /// The listing's `total_results`, fetching the first page if needed.
  pub async fn total_results(&mut self) -> Result<u64> {
    if self.total_results.is_none() && !self.done {
      self.fetch().await?;
    }
    Ok(self.total_results.unwrap_or_default())
  }

  /// The next record, or `None` once an empty page has been seen.
  pub async fn next(&mut self) -> Option<Result<Value>> {
    loop {
      if let Some(record) = self.buffer.pop_front() {
        return Some(Ok(record));
      }
      if self.done {
        return None;
      }
      if let Err(e) = self.fetch().await {
        return Some(Err(e));
      }
    }
  }

  /// The cursor the next request will use.
  pub fn id_below(&self) -> Option<i64> { self.query.id_below }

  async fn fetch(&mut self) -> Result<()> {
    let result = self.fetch_inner().await;
    if result.is_err() {
      self.done = true;
      self.buffer.clear();
    }
    result
  }

  async fn fetch_inner(&mut self) -> Result<()> {
    let page = self.source.fetch_page(&self.query).await?;
    let cursor = self.query.id_below;
    tracing::debug!(
      user = %self.query.user_login,
      id_below = ?cursor,
      results = page.results.len(),
      total = page.total_results,
      "fetched observation page"
    );

    self.total_results.get_or_insert(page.total_results);
    if page.results.is_empty() {
      self.done = true;
      return Ok(());
    }

    // The whole page is checked before any of it is buffered, so a bad
    // record ends the walk without yielding its neighbours.
    let mut fresh = Vec::with_capacity(page.results.len());
    let mut min_id: Option<i64> = None;
    for record in page.results {
      let id = record
        .get("id")
        .and_then(Value::as_i64)
        .ok_or(Error::MissingId { id_below: cursor })?;
      if cursor.is_some_and(|below| id >= below) {
        tracing::warn!(id, id_below = ?cursor, "skipping record the cursor already covered");
        continue;
      }
      min_id = Some(min_id.map_or(id, |m| m.min(id)));
      fresh.push(record);
    }
    self.buffer.extend(fresh);

    match min_id {
      Some(id) => self.query.id_below = Some(id),
      None => {
        tracing::warn!(id_below = ?cursor, "page made no progress; stopping");
        self.done = true;
      }
    }
    Ok(())
  }
}
