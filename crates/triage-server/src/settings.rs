//! Runtime configuration for the server binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use triage_core::QueueConfig;

/// Server configuration, deserialised from `config.toml` layered under
/// `TRIAGE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Offset of the service day from UTC, in minutes.
  pub utc_offset_minutes: i32,
  /// Seconds between background syncs with the store. `0` disables them.
  pub sync_interval_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8080,
      store_path:         PathBuf::from("~/.local/share/triage/queue.db"),
      utc_offset_minutes: 0,
      sync_interval_secs: 60,
    }
  }
}

impl ServerConfig {
  /// Load from `path` (optional) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TRIAGE"))
      .build()?
      .try_deserialize()
  }

  pub fn queue(&self) -> QueueConfig {
    QueueConfig { utc_offset_minutes: self.utc_offset_minutes }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
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
