//! Product catalog collaborator.

mod shopify;

use async_trait::async_trait;
use color_eyre::Result;

pub use shopify::ShopifyCatalog;

/// A storefront product, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
  pub id: u64,
  /// Human-readable slug, used as the cache key
  pub handle: String,
}

impl Product {
  pub fn new(id: u64, handle: impl Into<String>) -> Self {
    Self {
      id,
      handle: handle.into(),
    }
  }
}

/// Source of the full product list. Paging is the implementation's concern.
#[async_trait]
pub trait CatalogSource: Send + Sync {
  async fn list_products(&self) -> Result<Vec<Product>>;
}
