//! Review source collaborator.

mod judgeme;
mod memo;

use async_trait::async_trait;
use color_eyre::Result;

use crate::cache::ReviewMarker;

pub use judgeme::JudgeMeReviews;
pub use memo::MemoizedReviews;

/// A single product review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
  pub created_at: ReviewMarker,
  pub rating: u8,
  pub body: String,
}

impl Review {
  pub fn qualifies(&self, min_rating: u8) -> bool {
    self.rating >= min_rating
  }
}

/// Source of reviews for one product.
///
/// Implementations should return only reviews rated at least `min_rating`,
/// newest first; callers still re-check both.
#[async_trait]
pub trait ReviewSource: Send + Sync {
  async fn list_reviews(&self, product_id: u64, min_rating: u8) -> Result<Vec<Review>>;

  /// Called once at the start of every refresh run. Sources holding fetched
  /// reviews must drop them here so a run never sees an earlier run's data.
  async fn begin_run(&self) {}
}

/// Keep qualifying reviews only, newest first.
pub fn qualifying(mut reviews: Vec<Review>, min_rating: u8) -> Vec<Review> {
  reviews.retain(|r| r.qualifies(min_rating));
  reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  reviews
}

#[cfg(test)]
mod tests {
  use super::*;

  fn review(rating: u8, ts: &str) -> Review {
    Review {
      created_at: ReviewMarker::parse(ts).unwrap(),
      rating,
      body: format!("{} stars", rating),
    }
  }

  #[test]
  fn test_qualifying_filters_and_sorts_newest_first() {
    let reviews = vec![
      review(5, "2024-01-01T00:00:00Z"),
      review(4, "2024-03-01T00:00:00Z"),
      review(5, "2024-02-01T00:00:00Z"),
    ];

    let kept = qualifying(reviews, 5);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].created_at.to_string(), "2024-02-01T00:00:00Z");
    assert_eq!(kept[1].created_at.to_string(), "2024-01-01T00:00:00Z");
  }

  #[test]
  fn test_threshold_is_inclusive() {
    assert!(review(4, "2024-01-01T00:00:00Z").qualifies(4));
    assert!(!review(3, "2024-01-01T00:00:00Z").qualifies(4));
  }
}
