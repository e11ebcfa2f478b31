//! Incremental summary refresh.
//!
//! A run loads the cached snapshot, walks the catalog, regenerates summaries
//! only for products with a qualifying review newer than their cached marker,
//! and persists the snapshot once at the end.

mod detector;
mod error;
mod orchestrator;
mod trigger;

pub use detector::ChangeDetector;
pub use error::RefreshError;
pub use orchestrator::Refresher;
pub use trigger::RefreshTrigger;
