use std::time::Duration;
use thiserror::Error;

/// Run-level failures. Per-product problems never surface here.
#[derive(Debug, Error)]
pub enum RefreshError {
  #[error("Failed to load summary cache: {0:#}")]
  CacheLoad(color_eyre::Report),

  #[error("Failed to fetch product catalog: {0:#}")]
  Catalog(color_eyre::Report),

  #[error("Failed to persist summary cache: {0:#}")]
  Persist(color_eyre::Report),

  #[error("A refresh run is already in progress")]
  AlreadyRunning,

  #[error("Refresh run abandoned after {0:?}")]
  TimedOut(Duration),
}
