//! The import run: drain a [`Source`], store every record, then make sure the
//! derived views exist.

use std::collections::VecDeque;

use anyhow::Context as _;
use inat_client::{PageSource, Paginator};
use inat_core::{normalize_and_store, store::ObservationStore, table::VIEWS};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

// ─── Sources ─────────────────────────────────────────────────────────────────

/// Where raw observation records come from.
pub enum Source<P> {
  /// Live walk of a user's observations.
  Remote(Paginator<P>),
  /// Records read from a snapshot file, in file order.
  Snapshot(VecDeque<Value>),
}

impl<P: PageSource> Source<P> {
  pub fn snapshot(records: Vec<Value>) -> Self { Self::Snapshot(records.into()) }

  /// Expected number of records, used to size the progress bar.
  pub async fn total(&mut self) -> anyhow::Result<u64> {
    match self {
      Self::Remote(paginator) => paginator
        .total_results()
        .await
        .context("failed to fetch the first page of observations"),
      Self::Snapshot(records) => Ok(records.len() as u64),
    }
  }

  pub async fn next(&mut self) -> Option<anyhow::Result<Value>> {
    match self {
      Self::Remote(paginator) => paginator
        .next()
        .await
        .map(|r| r.context("failed to fetch observations")),
      Self::Snapshot(records) => records.pop_front().map(Ok),
    }
  }
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ImportSummary {
  /// Records normalized and stored.
  pub processed: u64,
  /// The raw records, kept only when a snapshot is to be written.
  pub saved:     Vec<Value>,
}

/// Store every record `source` yields, ticking `progress` once per record.
///
/// Stops at the first fetch or storage error. Records stored before the
/// error stay committed.
pub async fn import<P, S>(
  mut source: Source<P>,
  store: &S,
  progress: &ProgressBar,
  collect: bool,
) -> anyhow::Result<ImportSummary>
where
  P: PageSource,
  S: ObservationStore,
{
  let mut summary = ImportSummary::default();

  while let Some(raw) = source.next().await {
    let raw = raw?;
    let key = normalize_and_store(&raw, store).await.with_context(|| {
      format!("failed to store observation {}", raw.get("id").unwrap_or(&Value::Null))
    })?;
    tracing::trace!(%key, "stored observation");

    summary.processed += 1;
    progress.inc(1);
    if collect {
      summary.saved.push(raw);
    }
  }

  ensure_views(store).await?;
  Ok(summary)
}

/// Create every derived view, creating the tables it reads first.
pub async fn ensure_views<S: ObservationStore>(store: &S) -> anyhow::Result<()> {
  for view in VIEWS {
    for table in view.depends_on {
      store.ensure_table(*table).await?;
    }
    if store.create_view_if_absent(view).await? {
      tracing::info!(view = view.name, "created view");
    }
  }
  Ok(())
}

// ─── Progress ────────────────────────────────────────────────────────────────

pub fn progress_label(total: u64) -> String {
  let noun = if total == 1 { "observation" } else { "observations" };
  format!("Importing {total} {noun}")
}

/// A progress bar of `total` steps, or a hidden one when `silent`.
pub fn progress_bar(total: u64, silent: bool) -> ProgressBar {
  if silent {
    return ProgressBar::hidden();
  }
  let bar = ProgressBar::new(total);
  let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
  bar.set_style(style);
  bar.set_message(progress_label(total));
  bar
}
