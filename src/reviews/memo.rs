//! Short-lived memo in front of a review source.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{Review, ReviewSource};

struct Memo {
  reviews: Vec<Review>,
  fetched_at: DateTime<Utc>,
}

/// Reuses fetched review lists within one run.
///
/// The change detector and the summarizer both need a product's reviews in
/// the same run; this keeps that to one upstream fetch. Everything is
/// dropped when the next run begins, and `stale_time` bounds reuse inside a
/// long run. Errors are never memoized.
pub struct MemoizedReviews<S> {
  inner: S,
  /// How long before a memoized list is considered stale
  stale_time: Duration,
  entries: Mutex<HashMap<(u64, u8), Memo>>,
}

impl<S: ReviewSource> MemoizedReviews<S> {
  pub fn new(inner: S, stale_time: std::time::Duration) -> Self {
    Self {
      inner,
      stale_time: Duration::from_std(stale_time).unwrap_or(Duration::MAX),
      entries: Mutex::new(HashMap::new()),
    }
  }

  fn is_stale(&self, fetched_at: DateTime<Utc>) -> bool {
    Utc::now() - fetched_at >= self.stale_time
  }
}

#[async_trait]
impl<S: ReviewSource> ReviewSource for MemoizedReviews<S> {
  async fn list_reviews(&self, product_id: u64, min_rating: u8) -> Result<Vec<Review>> {
    let key = (product_id, min_rating);

    if let Some(memo) = self.entries.lock().await.get(&key) {
      if !self.is_stale(memo.fetched_at) {
        return Ok(memo.reviews.clone());
      }
    }

    let reviews = self.inner.list_reviews(product_id, min_rating).await?;

    self.entries.lock().await.insert(
      key,
      Memo {
        reviews: reviews.clone(),
        fetched_at: Utc::now(),
      },
    );

    Ok(reviews)
  }

  async fn begin_run(&self) {
    self.entries.lock().await.clear();
    self.inner.begin_run().await;
  }
}
