//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheSnapshot, ReviewMarker, SummaryStore};
use crate::catalog::{CatalogSource, Product};
use crate::reviews::{Review, ReviewSource};
use crate::summary::{SummaryBackend, SummaryProducer, SummaryResult};

pub fn marker(ts: &str) -> ReviewMarker {
  ReviewMarker::parse(ts).unwrap()
}

pub fn review(rating: u8, ts: &str) -> Review {
  Review {
    created_at: marker(ts),
    rating,
    body: format!("{} star review from {}", rating, ts),
  }
}

pub fn entry(ts: &str, summary: &str) -> CacheEntry {
  CacheEntry::new(marker(ts), summary)
}

// ============================================================================
// Catalog
// ============================================================================

pub struct FakeCatalog {
  products: Vec<Product>,
  failing: AtomicBool,
  delay: Option<Duration>,
}

impl FakeCatalog {
  pub fn new(products: Vec<Product>) -> Self {
    Self {
      products,
      failing: AtomicBool::new(false),
      delay: None,
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
  async fn list_products(&self) -> Result<Vec<Product>> {
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    if self.failing.load(Ordering::SeqCst) {
      return Err(eyre!("catalog unavailable"));
    }
    Ok(self.products.clone())
  }
}

// ============================================================================
// Reviews
// ============================================================================

/// Returns whatever was `set` for a product, unfiltered, so callers' own
/// threshold checks are exercised.
#[derive(Default)]
pub struct FakeReviews {
  by_product: Mutex<HashMap<u64, Vec<Review>>>,
  failing: Mutex<HashSet<u64>>,
  calls: AtomicUsize,
}

impl FakeReviews {
  pub fn set(&self, product_id: u64, reviews: Vec<Review>) {
    self.by_product.lock().unwrap().insert(product_id, reviews);
  }

  pub fn fail_for(&self, product_id: u64) {
    self.failing.lock().unwrap().insert(product_id);
  }

  pub fn recover(&self, product_id: u64) {
    self.failing.lock().unwrap().remove(&product_id);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ReviewSource for FakeReviews {
  async fn list_reviews(&self, product_id: u64, _min_rating: u8) -> Result<Vec<Review>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.failing.lock().unwrap().contains(&product_id) {
      return Err(eyre!("review API returned 503"));
    }
    Ok(
      self
        .by_product
        .lock()
        .unwrap()
        .get(&product_id)
        .cloned()
        .unwrap_or_default(),
    )
  }
}

#[async_trait]
impl ReviewSource for std::sync::Arc<FakeReviews> {
  async fn list_reviews(&self, product_id: u64, min_rating: u8) -> Result<Vec<Review>> {
    self.as_ref().list_reviews(product_id, min_rating).await
  }
}

// ============================================================================
// Summaries
// ============================================================================

/// Replies per handle; unknown handles get "Summary of <handle>".
#[derive(Default)]
pub struct FakeProducer {
  responses: Mutex<HashMap<String, SummaryResult>>,
  panics: Mutex<HashSet<String>>,
  calls: Mutex<Vec<String>>,
}

impl FakeProducer {
  pub fn reply(&self, handle: &str, text: &str) {
    self.respond(handle, SummaryResult::Text(text.to_string()));
  }

  pub fn fail(&self, handle: &str, reason: &str) {
    self.respond(handle, SummaryResult::Failure(reason.to_string()));
  }

  pub fn insufficient(&self, handle: &str, found: usize) {
    self.respond(handle, SummaryResult::InsufficientData { found });
  }

  pub fn panic_on(&self, handle: &str) {
    self.panics.lock().unwrap().insert(handle.to_string());
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  fn respond(&self, handle: &str, result: SummaryResult) {
    self
      .responses
      .lock()
      .unwrap()
      .insert(handle.to_string(), result);
  }
}

#[async_trait]
impl SummaryProducer for FakeProducer {
  async fn summarize(&self, product: &Product) -> SummaryResult {
    self.calls.lock().unwrap().push(product.handle.clone());

    let should_panic = self.panics.lock().unwrap().contains(&product.handle);
    if should_panic {
      panic!("producer blew up on {}", product.handle);
    }

    self
      .responses
      .lock()
      .unwrap()
      .get(&product.handle)
      .cloned()
      .unwrap_or_else(|| SummaryResult::Text(format!("Summary of {}", product.handle)))
  }
}

pub struct FakeBackend {
  reply: std::result::Result<String, String>,
  bodies: Mutex<Vec<Vec<String>>>,
}

impl FakeBackend {
  pub fn replying(text: &str) -> Self {
    Self {
      reply: Ok(text.to_string()),
      bodies: Mutex::new(Vec::new()),
    }
  }

  pub fn failing(reason: &str) -> Self {
    Self {
      reply: Err(reason.to_string()),
      bodies: Mutex::new(Vec::new()),
    }
  }

  pub fn calls(&self) -> usize {
    self.bodies.lock().unwrap().len()
  }

  pub fn last_bodies(&self) -> Vec<String> {
    self.bodies.lock().unwrap().last().cloned().unwrap_or_default()
  }
}

#[async_trait]
impl SummaryBackend for FakeBackend {
  async fn generate(&self, review_bodies: &[String]) -> Result<String> {
    self.bodies.lock().unwrap().push(review_bodies.to_vec());
    self.reply.clone().map_err(|reason| eyre!(reason))
  }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
  snapshot: Mutex<CacheSnapshot>,
  persists: AtomicUsize,
  fail_load: AtomicBool,
  fail_persist: AtomicBool,
}

impl MemoryStore {
  pub fn seed(&self, snapshot: CacheSnapshot) {
    *self.snapshot.lock().unwrap() = snapshot;
  }

  pub fn snapshot(&self) -> CacheSnapshot {
    self.snapshot.lock().unwrap().clone()
  }

  pub fn persists(&self) -> usize {
    self.persists.load(Ordering::SeqCst)
  }

  pub fn set_fail_load(&self, fail: bool) {
    self.fail_load.store(fail, Ordering::SeqCst);
  }

  pub fn set_fail_persist(&self, fail: bool) {
    self.fail_persist.store(fail, Ordering::SeqCst);
  }
}

#[async_trait]
impl SummaryStore for MemoryStore {
  async fn load(&self) -> Result<CacheSnapshot> {
    if self.fail_load.load(Ordering::SeqCst) {
      return Err(eyre!("store unreachable"));
    }
    Ok(self.snapshot())
  }

  async fn persist(&self, snapshot: &CacheSnapshot) -> Result<()> {
    if self.fail_persist.load(Ordering::SeqCst) {
      return Err(eyre!("write rejected"));
    }
    *self.snapshot.lock().unwrap() = snapshot.clone();
    self.persists.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn describe(&self) -> String {
    "memory".to_string()
  }
}
