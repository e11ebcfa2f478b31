//! Durable summary cache.
//!
//! This module provides:
//! - The in-memory [`CacheSnapshot`] (product handle -> marker + summary)
//! - The [`SummaryStore`] contract with crash-safe `persist`
//! - File, SQLite and hosted JSONBin backends, selected by configuration

mod file;
mod jsonbin;
mod snapshot;
mod sqlite;
mod traits;

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;

pub use file::JsonFileStore;
pub use jsonbin::JsonBinStore;
pub use snapshot::{CacheEntry, CacheSnapshot, ReviewMarker};
pub use sqlite::SqliteStore;
pub use traits::SummaryStore;

use crate::config::{StoreBackend, StoreConfig};

/// Open the store selected by `config`.
///
/// `jsonbin_api_key` is only consulted for the JSONBin backend.
pub fn open_store(
  config: &StoreConfig,
  http: reqwest::Client,
  jsonbin_api_key: impl FnOnce() -> Result<String>,
) -> Result<Arc<dyn SummaryStore>> {
  let store: Arc<dyn SummaryStore> = match config.backend {
    StoreBackend::File => {
      let path = match &config.path {
        Some(p) => p.clone(),
        None => JsonFileStore::default_path()?,
      };
      Arc::new(JsonFileStore::new(path))
    }
    StoreBackend::Sqlite => {
      let path = match &config.path {
        Some(p) => p.clone(),
        None => SqliteStore::default_path()?,
      };
      Arc::new(SqliteStore::open(&path)?)
    }
    StoreBackend::JsonBin => {
      let bin_id = config
        .bin_id
        .as_deref()
        .ok_or_else(|| eyre!("store.bin_id is required for the jsonbin backend"))?;
      Arc::new(JsonBinStore::new(
        http,
        &config.api_base,
        bin_id,
        jsonbin_api_key()?,
      )?)
    }
  };

  Ok(store)
}
