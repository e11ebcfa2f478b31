//! Shopify Admin API catalog client.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, LINK};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{CatalogSource, Product};
use crate::client::ensure_success;
use crate::config::Config;

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiProductsResponse {
  #[serde(default)]
  products: Vec<ApiProduct>,
}

#[derive(Debug, Deserialize)]
struct ApiProduct {
  id: u64,
  handle: String,
}

impl From<ApiProduct> for Product {
  fn from(p: ApiProduct) -> Self {
    Product::new(p.id, p.handle)
  }
}

// ============================================================================
// Client
// ============================================================================

/// Lists products through the Admin REST API, following cursor pagination.
pub struct ShopifyCatalog {
  http: reqwest::Client,
  first_page: Url,
  access_token: String,
}

impl ShopifyCatalog {
  pub fn new(config: &Config, http: reqwest::Client, access_token: String) -> Result<Self> {
    let base = format!(
      "https://{}/admin/api/{}/products.json",
      config.shop_host(),
      config.shopify.api_version
    );
    let first_page = Url::parse_with_params(
      &base,
      &[
        ("limit", config.shopify.page_size.to_string()),
        ("fields", "id,handle".to_string()),
      ],
    )
    .map_err(|e| eyre!("Invalid Shopify URL {}: {}", base, e))?;

    Ok(Self {
      http,
      first_page,
      access_token,
    })
  }
}

#[async_trait]
impl CatalogSource for ShopifyCatalog {
  async fn list_products(&self) -> Result<Vec<Product>> {
    let mut products = Vec::new();
    let mut next = Some(self.first_page.clone());

    while let Some(url) = next {
      let response = self
        .http
        .get(url)
        .header("X-Shopify-Access-Token", &self.access_token)
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch products: {}", e))?;

      let response = ensure_success(response, "Shopify product listing").await?;
      next = next_page_url(response.headers());

      let page: ApiProductsResponse = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse products: {}", e))?;

      debug!(count = page.products.len(), more = next.is_some(), "Fetched product page");
      products.extend(page.products.into_iter().map(Product::from));
    }

    Ok(products)
  }
}

fn next_page_url(headers: &HeaderMap) -> Option<Url> {
  headers
    .get(LINK)
    .and_then(|v| v.to_str().ok())
    .and_then(parse_next_link)
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header value.
fn parse_next_link(value: &str) -> Option<Url> {
  value.split(',').find_map(|link| {
    let mut parts = link.split(';');
    let target = parts.next()?.trim();
    let is_next = parts.any(|p| {
      let p = p.trim();
      p == r#"rel="next""# || p == "rel=next"
    });
    if !is_next {
      return None;
    }
    let target = target.strip_prefix('<')?.strip_suffix('>')?;
    Url::parse(target).ok()
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_next_link_with_previous_and_next() {
    let header = r#"<https://shop.myshopify.com/admin/api/2024-04/products.json?limit=250&page_info=abc>; rel="previous", <https://shop.myshopify.com/admin/api/2024-04/products.json?limit=250&page_info=def>; rel="next""#;
    let url = parse_next_link(header).unwrap();
    assert!(url.as_str().ends_with("page_info=def"));
  }

  #[test]
  fn test_parse_next_link_on_last_page() {
    let header = r#"<https://shop.myshopify.com/admin/api/2024-04/products.json?page_info=abc>; rel="previous""#;
    assert!(parse_next_link(header).is_none());
    assert!(parse_next_link("").is_none());
  }

  #[test]
  fn test_products_response_maps_to_domain() {
    let body: ApiProductsResponse = serde_json::from_str(
      r#"{"products": [{"id": 632910392, "handle": "ipod-nano", "title": "IPod Nano"}]}"#,
    )
    .unwrap();
    let products: Vec<Product> = body.products.into_iter().map(Product::from).collect();
    assert_eq!(products, vec![Product::new(632910392, "ipod-nano")]);
  }

  #[test]
  fn test_first_page_url() {
    let config = Config::from_yaml("shop_domain: https://shop.myshopify.com/\n").unwrap();
    let catalog = ShopifyCatalog::new(&config, reqwest::Client::new(), "t".into()).unwrap();
    assert_eq!(
      catalog.first_page.as_str(),
      "https://shop.myshopify.com/admin/api/2024-04/products.json?limit=250&fields=id%2Chandle"
    );
  }
}
