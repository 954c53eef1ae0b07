//! `inaturalist-to-sqlite`: save a user's iNaturalist observations to SQLite.
//!
//! ```
//! inaturalist-to-sqlite inaturalist.db some_user
//! inaturalist-to-sqlite inaturalist.db some_user --save observations.json
//! inaturalist-to-sqlite inaturalist.db --load observations.json
//! ```

mod import;
mod settings;
mod snapshot;

use std::{
  io::{self, BufRead, Write as _},
  path::PathBuf,
};

use anyhow::Context as _;
use clap::Parser;
use inat_client::{ApiClient, Paginator};
use inat_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  import::{Source, import, progress_bar},
  settings::Settings,
};

#[derive(Parser)]
#[command(author, version, about = "Save iNaturalist observations to a SQLite database")]
struct Cli {
  /// Path to the SQLite database; created if missing.
  db_path: PathBuf,

  /// iNaturalist username whose observations are fetched.
  #[arg(conflicts_with = "load")]
  username: Option<String>,

  /// Import observations from a JSON file instead of the API.
  #[arg(long, value_name = "FILE")]
  load: Option<PathBuf>,

  /// Also write the imported observations to a JSON file.
  #[arg(long, value_name = "FILE")]
  save: Option<PathBuf>,

  /// Don't show a progress bar.
  #[arg(short, long)]
  silent: bool,

  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "inaturalist.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so they never interleave with the progress bar.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let mut source = match &cli.load {
    Some(path) => Source::snapshot(snapshot::load(path)?),
    None => {
      let username = match cli.username {
        Some(username) => username,
        None => prompt_username()?,
      };
      let client = ApiClient::new(settings.api_config()).context("failed to build HTTP client")?;
      Source::Remote(Paginator::new(client, username))
    }
  };

  let store = SqliteStore::open(&cli.db_path)
    .await
    .with_context(|| format!("failed to open database {}", cli.db_path.display()))?;

  let total = source.total().await?;
  let progress = progress_bar(total, cli.silent);
  let summary = import(source, &store, &progress, cli.save.is_some()).await;
  progress.finish();
  let summary = summary?;

  if let Some(path) = &cli.save {
    snapshot::save(path, &summary.saved)?;
    tracing::info!(path = %path.display(), records = summary.saved.len(), "wrote snapshot");
  }

  tracing::info!(
    processed = summary.processed,
    db = %cli.db_path.display(),
    "import finished"
  );
  Ok(())
}

/// Ask for the username on stdin.
fn prompt_username() -> anyhow::Result<String> {
  eprint!("Please provide your iNaturalist username: ");
  io::stderr().flush()?;
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let username = line.trim();
  if username.is_empty() {
    anyhow::bail!("a username or --load is required");
  }
  Ok(username.to_owned())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;

  use super::*;

  #[test]
  fn cli_is_well_formed() { Cli::command().debug_assert(); }

  #[test]
  fn username_and_load_conflict() {
    let result = Cli::try_parse_from([
      "inaturalist-to-sqlite",
      "inat.db",
      "walker",
      "--load",
      "observations.json",
    ]);
    assert!(result.is_err());
  }

  #[test]
  fn parses_remote_run() {
    let cli = Cli::try_parse_from([
      "inaturalist-to-sqlite",
      "inat.db",
      "walker",
      "--save",
      "out.json",
      "-s",
    ])
    .unwrap();
    assert_eq!(cli.username.as_deref(), Some("walker"));
    assert_eq!(cli.save, Some(PathBuf::from("out.json")));
    assert!(cli.silent);
    assert_eq!(cli.config, PathBuf::from("inaturalist.toml"));
  }

  #[test]
  fn username_is_optional() {
    let cli = Cli::try_parse_from(["inaturalist-to-sqlite", "inat.db"]).unwrap();
    assert!(cli.username.is_none());
    assert!(cli.load.is_none());
  }
}
