//! JSON file summary store with atomic replace.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::snapshot::CacheSnapshot;
use super::traits::SummaryStore;

/// Stores the snapshot as a pretty-printed JSON object.
///
/// Writes go to a temp file in the same directory which is synced and then
/// renamed over the target, so readers only ever see a complete document.
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Default cache file under the user's data directory.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(
      data_dir
        .join("review-digest")
        .join("review-summary-cache.json"),
    )
  }

  fn read(&self) -> Result<CacheSnapshot> {
    let contents = match fs::read_to_string(&self.path) {
      Ok(contents) => contents,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheSnapshot::default()),
      Err(e) => {
        return Err(eyre!(
          "Failed to read cache file {}: {}",
          self.path.display(),
          e
        ))
      }
    };

    if contents.trim().is_empty() {
      return Ok(CacheSnapshot::default());
    }

    serde_json::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse cache file {}: {}", self.path.display(), e))
  }

  fn write(&self, snapshot: &CacheSnapshot) -> Result<()> {
    let parent = self
      .path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .unwrap_or_else(|| Path::new("."));
    let file_name = self
      .path
      .file_name()
      .ok_or_else(|| eyre!("Cache path {} has no file name", self.path.display()))?
      .to_string_lossy();

    fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create cache directory {}: {}", parent.display(), e))?;

    let data = serde_json::to_vec_pretty(snapshot)
      .map_err(|e| eyre!("Failed to serialize cache: {}", e))?;

    let tmp = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));
    if let Err(e) = write_synced(&tmp, &data).and_then(|_| fs::rename(&tmp, &self.path)) {
      let _ = fs::remove_file(&tmp);
      return Err(eyre!(
        "Failed to write cache file {}: {}",
        self.path.display(),
        e
      ));
    }

    // Make the rename itself durable.
    if let Ok(dir) = File::open(parent) {
      let _ = dir.sync_all();
    }

    Ok(())
  }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
  let mut file = File::create(path)?;
  file.write_all(data)?;
  file.sync_all()
}

#[async_trait]
impl SummaryStore for JsonFileStore {
  async fn load(&self) -> Result<CacheSnapshot> {
    self.read()
  }

  async fn persist(&self, snapshot: &CacheSnapshot) -> Result<()> {
    self.write(snapshot)
  }

  fn describe(&self) -> String {
    format!("file:{}", self.path.display())
  }
}
