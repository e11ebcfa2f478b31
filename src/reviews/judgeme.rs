//! Judge.me reviews API client.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{qualifying, Review, ReviewSource};
use crate::cache::ReviewMarker;
use crate::client::{endpoint, ensure_success};
use crate::config::Config;

/// Hard stop for runaway pagination.
const MAX_PAGES: u32 = 500;

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiReviewsResponse {
  #[serde(default)]
  reviews: Vec<ApiReview>,
}

#[derive(Debug, Deserialize)]
struct ApiReview {
  #[serde(default)]
  id: Option<u64>,
  rating: u8,
  #[serde(default)]
  body: Option<String>,
  created_at: String,
  /// Shopify product id; Judge.me sends a number but older payloads use strings
  #[serde(default)]
  product_external_id: Option<Value>,
}

impl ApiReview {
  fn is_for_product(&self, product_id: u64) -> bool {
    match &self.product_external_id {
      Some(Value::Number(n)) => n.as_u64() == Some(product_id),
      Some(Value::String(s)) => s.trim() == product_id.to_string(),
      _ => false,
    }
  }

  fn into_review(self) -> Option<Review> {
    match ReviewMarker::parse(&self.created_at) {
      Ok(created_at) => Some(Review {
        created_at,
        rating: self.rating,
        body: self.body.unwrap_or_default(),
      }),
      Err(e) => {
        warn!(review_id = ?self.id, "Skipping review with bad timestamp: {}", e);
        None
      }
    }
  }
}

// ============================================================================
// Client
// ============================================================================

/// Pages through the shop's reviews and keeps those for the requested product.
pub struct JudgeMeReviews {
  http: reqwest::Client,
  reviews_url: Url,
  api_token: String,
  shop_domain: String,
  per_page: u32,
}

impl JudgeMeReviews {
  pub fn new(config: &Config, http: reqwest::Client, api_token: String) -> Result<Self> {
    Ok(Self {
      http,
      reviews_url: endpoint(&config.judgeme.api_base, "reviews")?,
      api_token,
      shop_domain: config.shop_host().to_string(),
      per_page: config.judgeme.per_page,
    })
  }

  async fn fetch_page(&self, page: u32) -> Result<Vec<ApiReview>> {
    let page_param = page.to_string();
    let per_page_param = self.per_page.to_string();

    let response = self
      .http
      .get(self.reviews_url.clone())
      .query(&[
        ("api_token", self.api_token.as_str()),
        ("shop_domain", self.shop_domain.as_str()),
        ("page", page_param.as_str()),
        ("per_page", per_page_param.as_str()),
      ])
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch reviews page {}: {}", page, e))?;

    let body: ApiReviewsResponse = ensure_success(response, "Judge.me review listing")
      .await?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse reviews page {}: {}", page, e))?;

    Ok(body.reviews)
  }
}

#[async_trait]
impl ReviewSource for JudgeMeReviews {
  async fn list_reviews(&self, product_id: u64, min_rating: u8) -> Result<Vec<Review>> {
    let mut matching = Vec::new();
    let mut total = 0usize;

    for page in 1..=MAX_PAGES {
      let reviews = self.fetch_page(page).await?;
      let count = reviews.len();
      total += count;

      matching.extend(
        reviews
          .into_iter()
          .filter(|r| r.is_for_product(product_id) && r.rating >= min_rating)
          .filter_map(ApiReview::into_review),
      );

      if count < self.per_page as usize {
        break;
      }
      if page == MAX_PAGES {
        warn!(product_id, "Stopped paging reviews after {} pages", MAX_PAGES);
      }
    }

    debug!(product_id, total, matching = matching.len(), "Fetched reviews");
    Ok(qualifying(matching, min_rating))
  }
}
