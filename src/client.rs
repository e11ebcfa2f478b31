//! Shared HTTP client setup for outbound API calls.

use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("review-digest/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all collaborators.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
  reqwest::Client::builder()
    .user_agent(USER_AGENT)
    .timeout(timeout)
    .build()
    .map_err(|e| eyre!("Failed to create HTTP client: {}", e))
}

/// Join an API base URL and a path, tolerating slashes on either side.
pub fn endpoint(base: &str, path: &str) -> Result<Url> {
  let joined = format!(
    "{}/{}",
    base.trim_end_matches('/'),
    path.trim_start_matches('/')
  );
  Url::parse(&joined).map_err(|e| eyre!("Invalid endpoint URL {}: {}", joined, e))
}

/// Turn a non-success response into an error carrying the response body.
pub async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  let body = body.trim();
  if body.is_empty() {
    Err(eyre!("{} failed with status {}", what, status))
  } else {
    Err(eyre!("{} failed with status {}: {}", what, status, body))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_endpoint_joins_slashes() {
    let url = endpoint("https://judge.me/api/v1/", "/reviews").unwrap();
    assert_eq!(url.as_str(), "https://judge.me/api/v1/reviews");

    let url = endpoint("https://api.jsonbin.io/v3", "b/abc/latest").unwrap();
    assert_eq!(url.as_str(), "https://api.jsonbin.io/v3/b/abc/latest");
  }

  #[test]
  fn test_endpoint_rejects_relative_base() {
    assert!(endpoint("judge.me", "reviews").is_err());
  }
}
