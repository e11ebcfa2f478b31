//! Hosted JSON document store (jsonbin.io).

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use url::Url;

use super::snapshot::CacheSnapshot;
use super::traits::SummaryStore;
use crate::client::{endpoint, ensure_success};

/// Read response: the document lives under `record`, next to bin metadata.
#[derive(Debug, Deserialize)]
struct ApiBinResponse {
  #[serde(default)]
  record: Option<CacheSnapshot>,
}

/// Summary store backed by a single hosted JSON bin.
///
/// A `PUT` replaces the whole document server-side, which is the atomic
/// replace this store relies on.
pub struct JsonBinStore {
  http: reqwest::Client,
  latest_url: Url,
  bin_url: Url,
  api_key: String,
}

impl JsonBinStore {
  pub fn new(http: reqwest::Client, api_base: &str, bin_id: &str, api_key: String) -> Result<Self> {
    let bin_id = bin_id.trim();
    if bin_id.is_empty() {
      return Err(eyre!("JSONBin store requires a bin id"));
    }

    Ok(Self {
      http,
      latest_url: endpoint(api_base, &format!("b/{}/latest", bin_id))?,
      bin_url: endpoint(api_base, &format!("b/{}", bin_id))?,
      api_key,
    })
  }
}

#[async_trait]
impl SummaryStore for JsonBinStore {
  async fn load(&self) -> Result<CacheSnapshot> {
    let response = self
      .http
      .get(self.latest_url.clone())
      .header("X-Master-Key", &self.api_key)
      .send()
      .await
      .map_err(|e| eyre!("Failed to read JSONBin: {}", e))?;

    let body: ApiBinResponse = ensure_success(response, "JSONBin read")
      .await?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse JSONBin record: {}", e))?;

    Ok(body.record.unwrap_or_default())
  }

  async fn persist(&self, snapshot: &CacheSnapshot) -> Result<()> {
    let response = self
      .http
      .put(self.bin_url.clone())
      .header("X-Master-Key", &self.api_key)
      .json(snapshot)
      .send()
      .await
      .map_err(|e| eyre!("Failed to write JSONBin: {}", e))?;

    ensure_success(response, "JSONBin write").await?;
    Ok(())
  }

  fn describe(&self) -> String {
    format!("jsonbin:{}", self.bin_url)
  }
}
