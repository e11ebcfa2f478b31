//! Summary generation for products whose reviews changed.

mod chat;
mod prompt;

use async_trait::async_trait;
use color_eyre::Result;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::Product;
use crate::config::SummaryConfig;
use crate::reviews::{qualifying, ReviewSource};

pub use chat::ChatCompletionsBackend;

/// Outcome of asking for a product summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryResult {
  /// Usable summary text
  Text(String),
  /// Too few qualifying reviews to say anything; expected and benign
  InsufficientData { found: usize },
  /// Something went wrong upstream
  Failure(String),
}

/// Produces a summary for one product. Never errors: every outcome is a
/// [`SummaryResult`] variant.
#[async_trait]
pub trait SummaryProducer: Send + Sync {
  async fn summarize(&self, product: &Product) -> SummaryResult;
}

/// Text generation backend (an LLM behind an API).
#[async_trait]
pub trait SummaryBackend: Send + Sync {
  async fn generate(&self, review_bodies: &[String]) -> Result<String>;
}

/// Summarizes a product's most recent qualifying reviews.
///
/// Products with fewer than `min_reviews` qualifying reviews are reported as
/// [`SummaryResult::InsufficientData`] without calling the backend.
pub struct ReviewSummarizer {
  reviews: Arc<dyn ReviewSource>,
  backend: Arc<dyn SummaryBackend>,
  min_rating: u8,
  min_reviews: usize,
  max_reviews: usize,
}

impl ReviewSummarizer {
  pub fn new(
    reviews: Arc<dyn ReviewSource>,
    backend: Arc<dyn SummaryBackend>,
    config: &SummaryConfig,
    min_rating: u8,
  ) -> Self {
    Self {
      reviews,
      backend,
      min_rating,
      min_reviews: config.min_reviews,
      max_reviews: config.max_reviews,
    }
  }
}

#[async_trait]
impl SummaryProducer for ReviewSummarizer {
  async fn summarize(&self, product: &Product) -> SummaryResult {
    let reviews = match self.reviews.list_reviews(product.id, self.min_rating).await {
      Ok(reviews) => qualifying(reviews, self.min_rating),
      Err(e) => return SummaryResult::Failure(format!("Failed to fetch reviews: {:#}", e)),
    };

    let found = reviews.len();
    if found < self.min_reviews {
      return SummaryResult::InsufficientData { found };
    }

    let bodies: Vec<String> = reviews
      .into_iter()
      .take(self.max_reviews)
      .map(|r| r.body)
      .filter(|b| !b.trim().is_empty())
      .collect();

    // Ratings without text give the model nothing to summarize.
    if bodies.is_empty() {
      return SummaryResult::InsufficientData { found };
    }

    debug!(handle = %product.handle, reviews = bodies.len(), "Generating summary");

    match self.backend.generate(&bodies).await {
      Ok(text) if !text.trim().is_empty() => SummaryResult::Text(text.trim().to_string()),
      Ok(_) => SummaryResult::Failure("Summary backend returned empty text".to_string()),
      Err(e) => SummaryResult::Failure(format!("{:#}", e)),
    }
  }
}
