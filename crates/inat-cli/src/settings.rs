//! Layered runtime settings: optional TOML file, then `INAT_*` environment.

use std::{path::Path, time::Duration};

use anyhow::Context as _;
use inat_client::ApiConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub api_base_url: String,
  pub timeout_secs: u64,
  pub user_agent:   String,
}

impl Default for Settings {
  fn default() -> Self {
    let api = ApiConfig::default();
    Self {
      api_base_url: api.base_url,
      timeout_secs: api.timeout.as_secs(),
      user_agent:   api.user_agent,
    }
  }
}

impl Settings {
  /// Read `path` if it exists, then apply `INAT_`-prefixed overrides.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("INAT"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      base_url:   self.api_base_url.clone(),
      timeout:    Duration::from_secs(self.timeout_secs),
      user_agent: self.user_agent.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.api_base_url, "https://api.inaturalist.org/v1");
    assert_eq!(settings.timeout_secs, 30);
  }

  #[test]
  fn file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "api_base_url = \"http://localhost:9999/v1\"\ntimeout_secs = 5").unwrap();

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.api_base_url, "http://localhost:9999/v1");
    assert_eq!(settings.api_config().timeout, Duration::from_secs(5));
    assert!(settings.user_agent.starts_with("inaturalist-to-sqlite/"));
  }
}
