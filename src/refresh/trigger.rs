//! Entry point for starting runs; at most one run is in flight.

use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, warn};

use super::error::RefreshError;
use super::orchestrator::{Refresher, RunReport};

/// Starts refresh runs and rejects overlapping triggers.
///
/// Two overlapping runs would compute divergent snapshots and the later
/// `persist` would silently drop the other's updates, so a trigger that
/// arrives while a run is active fails with [`RefreshError::AlreadyRunning`].
pub struct RefreshTrigger {
  refresher: Refresher,
  gate: Mutex<()>,
  timeout: Option<Duration>,
}

impl RefreshTrigger {
  pub fn new(refresher: Refresher) -> Self {
    Self {
      refresher,
      gate: Mutex::new(()),
      timeout: None,
    }
  }

  /// Abandon runs that take longer than `timeout`. An abandoned run never
  /// persists.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  #[allow(dead_code)]
  pub fn is_running(&self) -> bool {
    self.gate.try_lock().is_err()
  }

  /// Start exactly one run and wait for it.
  pub async fn trigger(&self) -> Result<RunReport, RefreshError> {
    let _running = self.gate.try_lock().map_err(|_| {
      warn!("Refresh already in progress, rejecting trigger");
      RefreshError::AlreadyRunning
    })?;

    match self.timeout {
      Some(limit) => match tokio::time::timeout(limit, self.refresher.run()).await {
        Ok(result) => result,
        Err(_) => {
          error!(timeout_secs = limit.as_secs(), "Refresh run timed out, discarding results");
          Err(RefreshError::TimedOut(limit))
        }
      },
      None => self.refresher.run().await,
    }
  }
}
