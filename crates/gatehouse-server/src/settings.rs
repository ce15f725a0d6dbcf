//! Runtime configuration, layered from an optional TOML file and
//! `GATEHOUSE_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::FixedOffset;
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Local offset for calendar days and the 05:00 return deadline.
  pub utc_offset_minutes: i32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8080,
      store_path:         PathBuf::from("gatehouse.db"),
      utc_offset_minutes: 0,
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("GATEHOUSE"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn offset(&self) -> anyhow::Result<FixedOffset> {
    self
      .utc_offset_minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .with_context(|| format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
