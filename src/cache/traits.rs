//! Durable store contract for the summary cache.

use async_trait::async_trait;
use color_eyre::Result;

use super::snapshot::CacheSnapshot;

/// Durable home of the [`CacheSnapshot`].
///
/// Implementations are used by a single writer per run; they need no internal
/// coordination beyond being shareable across tasks.
#[async_trait]
pub trait SummaryStore: Send + Sync {
  /// Load the persisted snapshot.
  ///
  /// Returns an empty snapshot when nothing has been persisted yet. Unreadable
  /// or malformed state is an error.
  async fn load(&self) -> Result<CacheSnapshot>;

  /// Atomically replace the persisted snapshot.
  ///
  /// On failure the previously persisted state must still be what `load`
  /// returns.
  async fn persist(&self, snapshot: &CacheSnapshot) -> Result<()>;

  /// Human-readable location, for logs.
  fn describe(&self) -> String;
}
