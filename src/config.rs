use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Shop domain, e.g. "example.myshopify.com"
  pub shop_domain: String,
  #[serde(default)]
  pub shopify: ShopifyConfig,
  #[serde(default)]
  pub judgeme: JudgeMeConfig,
  #[serde(default)]
  pub summary: SummaryConfig,
  #[serde(default)]
  pub refresh: RefreshConfig,
  #[serde(default)]
  pub store: StoreConfig,
  /// Directory for daily-rolling log files (stderr only if unset)
  pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShopifyConfig {
  pub api_version: String,
  /// Products per catalog page (Shopify caps this at 250)
  pub page_size: u32,
}

impl Default for ShopifyConfig {
  fn default() -> Self {
    Self {
      api_version: "2024-04".to_string(),
      page_size: 250,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JudgeMeConfig {
  pub api_base: String,
  pub per_page: u32,
}

impl Default for JudgeMeConfig {
  fn default() -> Self {
    Self {
      api_base: "https://judge.me/api/v1".to_string(),
      per_page: 100,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
  /// OpenAI-compatible API base (Groq by default)
  pub api_base: String,
  pub model: String,
  pub temperature: f32,
  pub max_tokens: u32,
  /// Below this many qualifying reviews no summary is generated
  pub min_reviews: usize,
  /// Most recent reviews fed into the prompt
  pub max_reviews: usize,
}

impl Default for SummaryConfig {
  fn default() -> Self {
    Self {
      api_base: "https://api.groq.com/openai/v1".to_string(),
      model: "llama3-70b-8192".to_string(),
      temperature: 0.5,
      max_tokens: 70,
      min_reviews: 3,
      max_reviews: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
  /// Minimum rating for a review to count as qualifying
  pub min_rating: u8,
  /// Products checked in parallel (1 = sequential)
  pub concurrency: usize,
  /// How long fetched review lists are reused
  pub review_ttl_secs: u64,
  /// Abandon a run (without persisting) after this many seconds
  pub run_timeout_secs: Option<u64>,
  /// Per-request HTTP timeout
  pub http_timeout_secs: u64,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    Self {
      min_rating: 5,
      concurrency: 1,
      review_ttl_secs: 600,
      run_timeout_secs: None,
      http_timeout_secs: 30,
    }
  }
}

impl RefreshConfig {
  pub fn review_ttl(&self) -> Duration {
    Duration::from_secs(self.review_ttl_secs)
  }

  pub fn run_timeout(&self) -> Option<Duration> {
    self.run_timeout_secs.map(Duration::from_secs)
  }

  pub fn http_timeout(&self) -> Duration {
    Duration::from_secs(self.http_timeout_secs)
  }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
  /// Local JSON file
  #[default]
  File,
  /// Local SQLite database
  Sqlite,
  /// Hosted jsonbin.io document
  JsonBin,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  pub backend: StoreBackend,
  /// File or database path (defaults under the user data directory)
  pub path: Option<PathBuf>,
  pub bin_id: Option<String>,
  pub api_base: String,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      backend: StoreBackend::File,
      path: None,
      bin_id: None,
      api_base: "https://api.jsonbin.io/v3".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./review-digest.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/review-digest/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/review-digest/config.yaml\n\
         See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("review-digest.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("review-digest").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to load config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Invalid configuration: {}", e))?;
    config.validate()?;
    Ok(config)
  }

  /// Check values serde can't: ranges and required combinations.
  pub fn validate(&self) -> Result<()> {
    if self.shop_host().is_empty() {
      return Err(eyre!("shop_domain must not be empty"));
    }
    if !(1..=5).contains(&self.refresh.min_rating) {
      return Err(eyre!(
        "refresh.min_rating must be between 1 and 5, got {}",
        self.refresh.min_rating
      ));
    }
    if self.refresh.concurrency == 0 {
      return Err(eyre!("refresh.concurrency must be at least 1"));
    }
    if self.summary.max_reviews == 0 {
      return Err(eyre!("summary.max_reviews must be at least 1"));
    }
    if self.judgeme.per_page == 0 || self.shopify.page_size == 0 {
      return Err(eyre!("page sizes must be at least 1"));
    }
    if self.store.backend == StoreBackend::JsonBin && self.store.bin_id.is_none() {
      return Err(eyre!("store.bin_id is required for the jsonbin backend"));
    }
    Ok(())
  }

  /// Shop domain without scheme or trailing slash.
  pub fn shop_host(&self) -> &str {
    let domain = self.shop_domain.trim();
    let domain = domain
      .strip_prefix("https://")
      .or_else(|| domain.strip_prefix("http://"))
      .unwrap_or(domain);
    domain.trim_end_matches('/')
  }

  /// Get the Shopify Admin API token from environment variables.
  pub fn shopify_admin_token() -> Result<String> {
    std::env::var("SHOPIFY_ADMIN_TOKEN").map_err(|_| {
      eyre!("Shopify admin token not found. Set SHOPIFY_ADMIN_TOKEN environment variable.")
    })
  }

  /// Get the Judge.me API token from environment variables.
  pub fn judgeme_api_token() -> Result<String> {
    std::env::var("JUDGEME_API_TOKEN")
      .map_err(|_| eyre!("Judge.me token not found. Set JUDGEME_API_TOKEN environment variable."))
  }

  /// Get the summary backend API key from environment variables.
  ///
  /// Checks GROQ_API_KEY first, then OPENAI_API_KEY as fallback.
  pub fn summary_api_key() -> Result<String> {
    std::env::var("GROQ_API_KEY")
      .or_else(|_| std::env::var("OPENAI_API_KEY"))
      .map_err(|_| {
        eyre!("Summary API key not found. Set GROQ_API_KEY or OPENAI_API_KEY environment variable.")
      })
  }

  /// Get the JSONBin master key from environment variables.
  pub fn jsonbin_api_key() -> Result<String> {
    std::env::var("JSONBIN_API_KEY")
      .map_err(|_| eyre!("JSONBin key not found. Set JSONBIN_API_KEY environment variable."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("shop_domain: example.myshopify.com\n").unwrap();
    assert_eq!(config.refresh.min_rating, 5);
    assert_eq!(config.refresh.concurrency, 1);
    assert_eq!(config.summary.min_reviews, 3);
    assert_eq!(config.summary.max_reviews, 10);
    assert_eq!(config.summary.model, "llama3-70b-8192");
    assert_eq!(config.store.backend, StoreBackend::File);
    assert_eq!(config.shopify.api_version, "2024-04");
    assert!(config.log_dir.is_none());
  }

  #[test]
  fn test_sections_override_defaults() {
    let config = Config::from_yaml(
      r#"
shop_domain: https://example.myshopify.com/
refresh:
  min_rating: 4
  concurrency: 8
store:
  backend: sqlite
  path: /tmp/cache.db
summary:
  min_reviews: 5
"#,
    )
    .unwrap();

    assert_eq!(config.shop_host(), "example.myshopify.com");
    assert_eq!(config.refresh.min_rating, 4);
    assert_eq!(config.refresh.concurrency, 8);
    assert_eq!(config.refresh.review_ttl_secs, 600);
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(config.store.path, Some(PathBuf::from("/tmp/cache.db")));
    assert_eq!(config.summary.min_reviews, 5);
    assert_eq!(config.summary.max_tokens, 70);
  }

  #[test]
  fn test_missing_shop_domain_is_rejected() {
    assert!(Config::from_yaml("refresh:\n  concurrency: 2\n").is_err());
    assert!(Config::from_yaml("shop_domain: ''\n").is_err());
  }

  #[test]
  fn test_out_of_range_values_are_rejected() {
    assert!(Config::from_yaml("shop_domain: s\nrefresh:\n  min_rating: 6\n").is_err());
    assert!(Config::from_yaml("shop_domain: s\nrefresh:\n  concurrency: 0\n").is_err());
  }

  #[test]
  fn test_jsonbin_backend_requires_bin_id() {
    assert!(Config::from_yaml("shop_domain: s\nstore:\n  backend: jsonbin\n").is_err());
    let config =
      Config::from_yaml("shop_domain: s\nstore:\n  backend: jsonbin\n  bin_id: abc\n").unwrap();
    assert_eq!(config.store.backend, StoreBackend::JsonBin);
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/review-digest.yaml"))).is_err());
  }
}
