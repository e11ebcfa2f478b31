mod cache;
mod catalog;
mod client;
mod config;
mod logging;
mod refresh;
mod reviews;
mod summary;
#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use cache::SummaryStore;
use catalog::ShopifyCatalog;
use config::Config;
use refresh::{ChangeDetector, RefreshTrigger, Refresher};
use reviews::{JudgeMeReviews, MemoizedReviews, ReviewSource};
use summary::{ChatCompletionsBackend, ReviewSummarizer};

#[derive(Parser, Debug)]
#[command(name = "review-digest")]
#[command(about = "Keeps cached AI summaries of five-star product reviews up to date")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/review-digest/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Shop domain, overriding the config file
  #[arg(long, global = true)]
  shop: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run one refresh pass over the catalog
  Refresh,
  /// Run refresh passes on a fixed interval until interrupted
  Watch {
    /// Seconds between runs
    #[arg(short, long, default_value_t = 3600)]
    interval: u64,
  },
  /// Print the cached summary for a product as JSON
  Show {
    /// Product handle
    handle: String,
  },
  /// List cached products and their latest review markers
  List,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  // Override shop if specified on command line
  let config = if let Some(shop) = args.shop {
    Config {
      shop_domain: shop,
      ..config
    }
  } else {
    config
  };
  config.validate()?;

  let _log_guard = logging::init(config.log_dir.as_deref())?;

  let http = client::http_client(config.refresh.http_timeout())?;
  let store = cache::open_store(&config.store, http.clone(), Config::jsonbin_api_key)?;

  match args.command {
    Command::Refresh => {
      let trigger = build_trigger(&config, http, store)?;
      let report = trigger.trigger().await?;
      if report.failed() > 0 {
        info!(failed = report.failed(), "Some products could not be refreshed, see log");
      }
    }
    Command::Watch { interval } => {
      let trigger = build_trigger(&config, http, store)?;
      watch(&trigger, Duration::from_secs(interval.max(1))).await;
    }
    Command::Show { handle } => {
      let snapshot = store.load().await?;
      let entry = snapshot
        .get(&handle)
        .ok_or_else(|| eyre!("No summary found for product '{}'", handle))?;
      println!("{}", serde_json::to_string_pretty(entry)?);
    }
    Command::List => {
      let snapshot = store.load().await?;
      if snapshot.is_empty() {
        eprintln!("No cached summaries in {}", store.describe());
      }
      for (handle, entry) in snapshot.iter() {
        println!("{}\t{}", handle, entry.last_reviewed_at);
      }
    }
  }

  Ok(())
}

/// Wire the production collaborators into a trigger.
fn build_trigger(
  config: &Config,
  http: reqwest::Client,
  store: Arc<dyn SummaryStore>,
) -> Result<RefreshTrigger> {
  let min_rating = config.refresh.min_rating;

  let catalog = ShopifyCatalog::new(config, http.clone(), Config::shopify_admin_token()?)?;
  // One memo shared by detector and summarizer; each run starts it empty.
  let reviews: Arc<dyn ReviewSource> = Arc::new(MemoizedReviews::new(
    JudgeMeReviews::new(config, http.clone(), Config::judgeme_api_token()?)?,
    config.refresh.review_ttl(),
  ));
  let backend = ChatCompletionsBackend::new(&config.summary, http, Config::summary_api_key()?)?;
  let producer = ReviewSummarizer::new(
    Arc::clone(&reviews),
    Arc::new(backend),
    &config.summary,
    min_rating,
  );

  let refresher = Refresher::new(
    Arc::new(catalog),
    ChangeDetector::new(reviews, min_rating),
    Arc::new(producer),
    store,
  )
  .with_concurrency(config.refresh.concurrency);

  Ok(RefreshTrigger::new(refresher).with_timeout(config.refresh.run_timeout()))
}

/// Trigger a run every `interval` until Ctrl-C.
async fn watch(trigger: &RefreshTrigger, interval: Duration) {
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

  info!(interval_secs = interval.as_secs(), "Watching for new reviews");

  loop {
    tokio::select! {
      _ = ticker.tick() => {}
      _ = tokio::signal::ctrl_c() => {
        info!("Interrupted, stopping");
        break;
      }
    }

    // Dropping an in-flight run before it persists leaves the cache untouched.
    tokio::select! {
      result = trigger.trigger() => {
        if let Err(e) = result {
          error!("Refresh run failed: {}", e);
        }
      }
      _ = tokio::signal::ctrl_c() => {
        info!("Interrupted, abandoning current run");
        break;
      }
    }
  }
}
