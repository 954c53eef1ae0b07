//! Async HTTP client for the observations listing.

use std::time::Duration;

use reqwest::Client;

use crate::{Error, ObservationPage, PageQuery, PageSource, Result};

/// Connection settings for the API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Base URL without the trailing resource, e.g. `https://api.inaturalist.org/v1`.
  pub base_url:   String,
  pub timeout:    Duration,
  pub user_agent: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url:   "https://api.inaturalist.org/v1".to_owned(),
      timeout:    Duration::from_secs(30),
      user_agent: concat!("inaturalist-to-sqlite/", env!("CARGO_PKG_VERSION")).to_owned(),
    }
  }
}

/// HTTP client for `GET /observations`.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(config.user_agent.clone())
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }
}

impl PageSource for ApiClient {
  /// `GET /observations?user_login=…&order=desc&order_by=id&per_page=30[&id_below=…]`
  async fn fetch_page(&self, query: &PageQuery) -> Result<ObservationPage> {
    let url = self.url("/observations");
    let resp = self
      .client
      .get(&url)
      .query(&query.params())
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status { url, status });
    }
    Ok(resp.json().await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_joins_base_and_path() {
    let client = ApiClient::new(ApiConfig {
      base_url: "https://api.example.org/v1/".into(),
      ..ApiConfig::default()
    })
    .unwrap();
    assert_eq!(client.url("/observations"), "https://api.example.org/v1/observations");
  }
}
