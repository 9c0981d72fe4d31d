use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api.base_url`.
pub const BASE_URL_ENV: &str = "STOCKDASH_API_BASE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Root of the inventory REST service, e.g. `http://localhost:8000`
  pub base_url: Option<String>,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: None,
      timeout_secs: 30,
    }
  }
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// How long an entry nobody watches is kept before eviction
  pub keep_unused_for_secs: u64,
  /// How often idle entries are swept
  pub sweep_interval_secs: u64,
  pub refetch_on_focus: bool,
  pub refetch_on_reconnect: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      keep_unused_for_secs: 60,
      sweep_interval_secs: 30,
      refetch_on_focus: true,
      refetch_on_reconnect: true,
    }
  }
}

impl CacheConfig {
  pub fn keep_unused_for(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.keep_unused_for_secs as i64)
  }

  pub fn sweep_interval(&self) -> Duration {
    Duration::from_secs(self.sweep_interval_secs.max(1))
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
  /// Persist preferences between runs. When off, changes last for the
  /// session only.
  pub enabled: bool,
  /// Database file; defaults to the platform data directory
  pub path: Option<PathBuf>,
  /// Upper bound on the startup read of persisted state
  pub rehydrate_timeout_ms: u64,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      rehydrate_timeout_ms: 2000,
    }
  }
}

impl PersistenceConfig {
  pub fn rehydrate_timeout(&self) -> Duration {
    Duration::from_millis(self.rehydrate_timeout_ms)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./stockdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/stockdash/config.yaml
  /// 4. ~/.config/stockdash/config.yaml
  ///
  /// Without any file the defaults are used.
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
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("stockdash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("stockdash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid and means "all defaults".
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Base URL of the REST service.
  ///
  /// Checks STOCKDASH_API_BASE_URL first, then `api.base_url`.
  pub fn base_url(&self) -> Result<String> {
    self.resolve_base_url(std::env::var(BASE_URL_ENV).ok())
  }

  fn resolve_base_url(&self, from_env: Option<String>) -> Result<String> {
    from_env
      .filter(|url| !url.trim().is_empty())
      .or_else(|| self.api.base_url.clone())
      .ok_or_else(|| {
        eyre!(
          "API base URL not set. Set {} or api.base_url in the config file.",
          BASE_URL_ENV
        )
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_file_keeps_defaults() {
    let config = Config::parse(
      "api:\n  base_url: http://localhost:8000\ncache:\n  keep_unused_for_secs: 5\n",
    )
    .unwrap();
    assert_eq!(config.api.base_url.as_deref(), Some("http://localhost:8000"));
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.cache.keep_unused_for(), chrono::Duration::seconds(5));
    assert!(config.cache.refetch_on_focus);
    assert!(config.persistence.enabled);
  }

  #[test]
  fn test_empty_file_is_defaults() {
    let config = Config::parse("").unwrap();
    assert!(config.api.base_url.is_none());
    assert_eq!(config.persistence.rehydrate_timeout(), Duration::from_secs(2));
  }

  #[test]
  fn test_bad_yaml_is_an_error() {
    assert!(Config::parse("cache: [1, 2").is_err());
    assert!(Config::parse("cache:\n  keep_unused_for_secs: soon\n").is_err());
  }

  #[test]
  fn test_env_overrides_base_url() {
    let mut config = Config::default();
    config.api.base_url = Some("http://file".into());

    let url = config.resolve_base_url(Some("http://env".into())).unwrap();
    assert_eq!(url, "http://env");
    let url = config.resolve_base_url(Some("  ".into())).unwrap();
    assert_eq!(url, "http://file");
  }

  #[test]
  fn test_missing_base_url() {
    assert!(Config::default().resolve_base_url(None).is_err());
  }

  #[test]
  fn test_explicit_missing_path() {
    assert!(Config::load(Some(Path::new("/nonexistent/stockdash.yaml"))).is_err());
  }
}
