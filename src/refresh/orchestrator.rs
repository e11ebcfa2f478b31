//! One refresh run over the whole catalog.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::detector::{ChangeDetector, Freshness};
use super::error::RefreshError;
use crate::cache::{CacheEntry, ReviewMarker, SummaryStore};
use crate::catalog::{CatalogSource, Product};
use crate::summary::{SummaryProducer, SummaryResult};

/// What happened to one product during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductOutcome {
  Updated { handle: String, entry: CacheEntry },
  UpToDate { handle: String },
  NoQualifyingReviews { handle: String },
  ReviewsUnavailable { handle: String, reason: String },
  InsufficientData { handle: String, found: usize },
  SummaryFailed { handle: String, reason: String },
  /// The product's task panicked
  Crashed { handle: String, reason: String },
}

impl ProductOutcome {
  pub fn handle(&self) -> &str {
    match self {
      Self::Updated { handle, .. }
      | Self::UpToDate { handle }
      | Self::NoQualifyingReviews { handle }
      | Self::ReviewsUnavailable { handle, .. }
      | Self::InsufficientData { handle, .. }
      | Self::SummaryFailed { handle, .. }
      | Self::Crashed { handle, .. } => handle,
    }
  }

  /// Operational failures, as opposed to benign "nothing to do" outcomes.
  pub fn is_failure(&self) -> bool {
    matches!(
      self,
      Self::ReviewsUnavailable { .. } | Self::SummaryFailed { .. } | Self::Crashed { .. }
    )
  }
}

/// Summary of a completed (persisted) run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
  pub outcomes: Vec<ProductOutcome>,
  pub elapsed: Duration,
}

impl RunReport {
  pub fn updated(&self) -> usize {
    self.count(|o| matches!(o, ProductOutcome::Updated { .. }))
  }

  pub fn unchanged(&self) -> usize {
    self.count(|o| {
      matches!(
        o,
        ProductOutcome::UpToDate { .. } | ProductOutcome::NoQualifyingReviews { .. }
      )
    })
  }

  pub fn insufficient(&self) -> usize {
    self.count(|o| matches!(o, ProductOutcome::InsufficientData { .. }))
  }

  pub fn failed(&self) -> usize {
    self.count(ProductOutcome::is_failure)
  }

  #[allow(dead_code)]
  pub fn outcome(&self, handle: &str) -> Option<&ProductOutcome> {
    self.outcomes.iter().find(|o| o.handle() == handle)
  }

  fn count(&self, pred: impl Fn(&ProductOutcome) -> bool) -> usize {
    self.outcomes.iter().filter(|o| pred(o)).count()
  }
}

/// Drives a full pass: load cache, list products, check and summarize each,
/// persist once.
pub struct Refresher {
  catalog: Arc<dyn CatalogSource>,
  detector: Arc<ChangeDetector>,
  producer: Arc<dyn SummaryProducer>,
  store: Arc<dyn SummaryStore>,
  concurrency: usize,
}

impl Refresher {
  pub fn new(
    catalog: Arc<dyn CatalogSource>,
    detector: ChangeDetector,
    producer: Arc<dyn SummaryProducer>,
    store: Arc<dyn SummaryStore>,
  ) -> Self {
    Self {
      catalog,
      detector: Arc::new(detector),
      producer,
      store,
      concurrency: 1,
    }
  }

  /// Check up to `concurrency` products at once.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  /// Run one pass.
  ///
  /// Nothing is written until every product has been processed; the store
  /// sees exactly one `persist` per successful run and none otherwise.
  pub async fn run(&self) -> Result<RunReport, RefreshError> {
    let started = Instant::now();
    self.detector.begin_run().await;

    let mut snapshot = self.store.load().await.map_err(RefreshError::CacheLoad)?;
    let products = self
      .catalog
      .list_products()
      .await
      .map_err(RefreshError::Catalog)?;

    info!(
      products = products.len(),
      cached = snapshot.len(),
      store = %self.store.describe(),
      "Starting refresh run"
    );

    let outcomes: Vec<ProductOutcome> = stream::iter(products)
      .map(|product| {
        let cached = snapshot
          .get(&product.handle)
          .map(|entry| entry.last_reviewed_at);
        self.process_isolated(product, cached)
      })
      .buffered(self.concurrency)
      .collect()
      .await;

    let mut report = RunReport::default();
    for outcome in outcomes {
      let outcome = match outcome {
        ProductOutcome::Updated { handle, entry } => {
          if snapshot.set(handle.clone(), entry.clone()) {
            ProductOutcome::Updated { handle, entry }
          } else {
            warn!(handle = %handle, "Refusing to move cached marker backwards");
            ProductOutcome::UpToDate { handle }
          }
        }
        other => other,
      };
      report.outcomes.push(outcome);
    }

    self
      .store
      .persist(&snapshot)
      .await
      .map_err(RefreshError::Persist)?;

    report.elapsed = started.elapsed();
    info!(
      updated = report.updated(),
      unchanged = report.unchanged(),
      insufficient = report.insufficient(),
      failed = report.failed(),
      elapsed_ms = report.elapsed.as_millis() as u64,
      "Refresh run complete"
    );

    Ok(report)
  }

  /// Process one product on its own task so a panic can't take the run down.
  async fn process_isolated(
    &self,
    product: Product,
    cached: Option<ReviewMarker>,
  ) -> ProductOutcome {
    let handle = product.handle.clone();
    let task = tokio::spawn(process_product(
      Arc::clone(&self.detector),
      Arc::clone(&self.producer),
      product,
      cached,
    ));

    match task.await {
      Ok(outcome) => outcome,
      Err(e) => {
        error!(handle = %handle, "Product refresh task failed: {}", e);
        ProductOutcome::Crashed {
          handle,
          reason: e.to_string(),
        }
      }
    }
  }
}

async fn process_product(
  detector: Arc<ChangeDetector>,
  producer: Arc<dyn SummaryProducer>,
  product: Product,
  cached: Option<ReviewMarker>,
) -> ProductOutcome {
  let handle = product.handle.clone();
  debug!(handle = %handle, "Checking product");

  let marker = match detector.check(&product, cached).await {
    Freshness::Stale { marker, qualifying } => {
      info!(handle = %handle, %marker, qualifying, "New review detected, generating summary");
      marker
    }
    Freshness::UpToDate { .. } => {
      debug!(handle = %handle, "No new reviews");
      return ProductOutcome::UpToDate { handle };
    }
    Freshness::NoQualifyingReviews => {
      debug!(handle = %handle, "No qualifying reviews, skipping");
      return ProductOutcome::NoQualifyingReviews { handle };
    }
    Freshness::SourceUnavailable(reason) => {
      return ProductOutcome::ReviewsUnavailable { handle, reason };
    }
  };

  match producer.summarize(&product).await {
    SummaryResult::Text(summary) => {
      info!(handle = %handle, "Updated summary");
      ProductOutcome::Updated {
        handle,
        entry: CacheEntry::new(marker, summary),
      }
    }
    SummaryResult::InsufficientData { found } => {
      info!(handle = %handle, found, "Not enough reviews to summarize yet");
      ProductOutcome::InsufficientData { handle, found }
    }
    SummaryResult::Failure(reason) => {
      warn!(handle = %handle, "Failed to generate summary: {}", reason);
      ProductOutcome::SummaryFailed { handle, reason }
    }
  }
}
