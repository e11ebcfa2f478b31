//! In-memory cache snapshot: product handle -> latest marker + summary.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Creation time of the most recent qualifying review known for a product.
///
/// Serialized as an RFC 3339 string in UTC (e.g. `2024-01-01T00:00:00Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReviewMarker(DateTime<Utc>);

impl ReviewMarker {
  /// Parse an ISO-8601 timestamp as returned by review APIs.
  ///
  /// Accepts RFC 3339 with any offset, plus the bare `YYYY-MM-DD HH:MM:SS`
  /// form (assumed UTC).
  pub fn parse(s: &str) -> Result<Self> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
      return Ok(Self(dt.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
      .map(|dt| Self(dt.and_utc()))
      .map_err(|e| eyre!("Invalid review timestamp '{}': {}", s, e))
  }
}

impl fmt::Display for ReviewMarker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
  }
}

impl FromStr for ReviewMarker {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

impl Serialize for ReviewMarker {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ReviewMarker {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Self::parse(&raw).map_err(serde::de::Error::custom)
  }
}

/// Cached summary for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
  pub last_reviewed_at: ReviewMarker,
  pub summary: String,
}

impl CacheEntry {
  pub fn new(last_reviewed_at: ReviewMarker, summary: impl Into<String>) -> Self {
    Self {
      last_reviewed_at,
      summary: summary.into(),
    }
  }
}

/// Full handle -> entry mapping, loaded at the start of a run and persisted
/// once at the end.
///
/// Serializes as a plain JSON object keyed by product handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot {
  entries: BTreeMap<String, CacheEntry>,
}

impl CacheSnapshot {
  pub fn get(&self, handle: &str) -> Option<&CacheEntry> {
    self.entries.get(handle)
  }

  /// Store an entry for `handle`.
  ///
  /// Markers never move backwards: if the stored entry has a newer marker the
  /// snapshot is left untouched and `false` is returned.
  pub fn set(&mut self, handle: impl Into<String>, entry: CacheEntry) -> bool {
    let handle = handle.into();
    if let Some(existing) = self.entries.get(&handle) {
      if existing.last_reviewed_at > entry.last_reviewed_at {
        return false;
      }
    }
    self.entries.insert(handle, entry);
    true
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }
}
