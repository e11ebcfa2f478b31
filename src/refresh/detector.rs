//! Per-product staleness check against the newest qualifying review.

use std::sync::Arc;
use tracing::warn;

use crate::cache::ReviewMarker;
use crate::catalog::Product;
use crate::reviews::ReviewSource;

/// Result of comparing a product's cached marker with its reviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
  /// A qualifying review newer than the cached marker exists (or nothing is
  /// cached yet).
  Stale {
    marker: ReviewMarker,
    qualifying: usize,
  },
  /// The cached marker is at least as new as the newest qualifying review.
  UpToDate { marker: ReviewMarker },
  /// No qualifying reviews exist, so there is nothing to summarize.
  NoQualifyingReviews,
  /// The review source failed; treated as "no update this cycle".
  SourceUnavailable(String),
}

impl Freshness {
  #[allow(dead_code)]
  pub fn is_stale(&self) -> bool {
    matches!(self, Freshness::Stale { .. })
  }
}

pub struct ChangeDetector {
  reviews: Arc<dyn ReviewSource>,
  min_rating: u8,
}

impl ChangeDetector {
  pub fn new(reviews: Arc<dyn ReviewSource>, min_rating: u8) -> Self {
    Self {
      reviews,
      min_rating,
    }
  }

  /// Reset per-run state held by the review source.
  pub async fn begin_run(&self) {
    self.reviews.begin_run().await;
  }

  /// Decide whether `product`'s cached summary needs regenerating.
  pub async fn check(&self, product: &Product, cached: Option<ReviewMarker>) -> Freshness {
    let reviews = match self.reviews.list_reviews(product.id, self.min_rating).await {
      Ok(reviews) => reviews,
      Err(e) => {
        warn!(handle = %product.handle, "Failed to fetch reviews: {:#}", e);
        return Freshness::SourceUnavailable(format!("{:#}", e));
      }
    };

    let qualifying: Vec<ReviewMarker> = reviews
      .iter()
      .filter(|r| r.qualifies(self.min_rating))
      .map(|r| r.created_at)
      .collect();

    compare(qualifying.iter().copied().max(), qualifying.len(), cached)
  }
}

fn compare(newest: Option<ReviewMarker>, count: usize, cached: Option<ReviewMarker>) -> Freshness {
  match (newest, cached) {
    (None, _) => Freshness::NoQualifyingReviews,
    (Some(marker), Some(cached)) if marker <= cached => Freshness::UpToDate { marker },
    (Some(marker), _) => Freshness::Stale {
      marker,
      qualifying: count,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{marker, review, FakeReviews};

  fn detector(reviews: FakeReviews) -> ChangeDetector {
    ChangeDetector::new(Arc::new(reviews), 5)
  }

  #[tokio::test]
  async fn test_nothing_cached_is_stale() {
    let reviews = FakeReviews::default();
    reviews.set(
      1,
      vec![
        review(5, "2024-01-01T00:00:00Z"),
        review(5, "2024-03-01T00:00:00Z"),
        review(5, "2024-02-01T00:00:00Z"),
      ],
    );

    let result = detector(reviews).check(&Product::new(1, "mug"), None).await;
    assert_eq!(
      result,
      Freshness::Stale {
        marker: marker("2024-03-01T00:00:00Z"),
        qualifying: 3
      }
    );
  }

  #[tokio::test]
  async fn test_newer_review_is_stale() {
    let reviews = FakeReviews::default();
    reviews.set(1, vec![review(5, "2024-01-02T00:00:00Z")]);

    let result = detector(reviews)
      .check(&Product::new(1, "mug"), Some(marker("2024-01-01T00:00:00Z")))
      .await;
    assert!(result.is_stale());
  }

  #[tokio::test]
  async fn test_equal_marker_is_not_stale() {
    let reviews = FakeReviews::default();
    reviews.set(1, vec![review(5, "2024-01-01T00:00:00Z")]);

    let result = detector(reviews)
      .check(&Product::new(1, "mug"), Some(marker("2024-01-01T00:00:00Z")))
      .await;
    assert_eq!(
      result,
      Freshness::UpToDate {
        marker: marker("2024-01-01T00:00:00Z")
      }
    );
  }

  #[tokio::test]
  async fn test_cached_marker_ahead_of_reviews_is_not_stale() {
    let reviews = FakeReviews::default();
    reviews.set(1, vec![review(5, "2024-01-01T00:00:00Z")]);

    let result = detector(reviews)
      .check(&Product::new(1, "mug"), Some(marker("2024-06-01T00:00:00Z")))
      .await;
    assert!(!result.is_stale());
  }

  #[tokio::test]
  async fn test_only_low_ratings_means_no_qualifying_reviews() {
    let reviews = FakeReviews::default();
    reviews.set(
      1,
      vec![
        review(4, "2024-05-01T00:00:00Z"),
        review(3, "2024-05-02T00:00:00Z"),
      ],
    );

    let result = detector(reviews).check(&Product::new(1, "mug"), None).await;
    assert_eq!(result, Freshness::NoQualifyingReviews);
  }

  #[tokio::test]
  async fn test_newer_low_rating_does_not_move_marker() {
    let reviews = FakeReviews::default();
    reviews.set(
      1,
      vec![
        review(5, "2024-01-01T00:00:00Z"),
        review(2, "2024-09-01T00:00:00Z"),
      ],
    );

    let result = detector(reviews)
      .check(&Product::new(1, "mug"), Some(marker("2024-01-01T00:00:00Z")))
      .await;
    assert!(!result.is_stale());
  }

  #[tokio::test]
  async fn test_source_error_fails_open() {
    let reviews = FakeReviews::default();
    reviews.fail_for(1);

    let result = detector(reviews).check(&Product::new(1, "mug"), None).await;
    assert!(matches!(result, Freshness::SourceUnavailable(_)));
    assert!(!result.is_stale());
  }
}
