use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2/pokemon";
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_KEY_PREFIX: &str = "poke_cache_v1_";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub paging: PagingConfig,
  pub cache: CacheConfig,
  pub connectivity: ConnectivityConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Listing endpoint; `limit` and `offset` are appended as query parameters
  pub base_url: String,
  pub request_timeout_secs: u64,
  /// Detail requests allowed in flight per page
  pub max_concurrent_details: usize,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      request_timeout_secs: 15,
      max_concurrent_details: DEFAULT_PAGE_SIZE,
    }
  }
}

impl ApiConfig {
  pub fn base_url(&self) -> Result<Url> {
    Url::parse(&self.base_url).map_err(|e| eyre!("Invalid api.base_url '{}': {}", self.base_url, e))
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
  pub page_size: usize,
}

impl Default for PagingConfig {
  fn default() -> Self {
    Self {
      page_size: DEFAULT_PAGE_SIZE,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// When false, nothing is persisted between runs
  pub enabled: bool,
  pub ttl_hours: i64,
  pub key_prefix: String,
  /// SQLite file (defaults to $XDG_DATA_HOME/pokepage/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ttl_hours: 24,
      key_prefix: DEFAULT_KEY_PREFIX.to_string(),
      path: None,
    }
  }
}

impl CacheConfig {
  /// Saturates for hour counts chrono cannot represent; `validate` rejects those.
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::try_hours(self.ttl_hours).unwrap_or(chrono::Duration::MAX)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
  /// How often to probe the API for reachability
  pub probe_interval_secs: u64,
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      probe_interval_secs: 30,
    }
  }
}

impl ConnectivityConfig {
  pub fn probe_interval(&self) -> Duration {
    Duration::from_secs(self.probe_interval_secs.max(1))
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Default filter directive; RUST_LOG takes precedence
  pub level: String,
  /// Log to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      file: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pokepage.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pokepage/config.yaml
  /// 4. Built-in defaults
  ///
  /// `POKEPAGE_API_URL` overrides `api.base_url` in every case.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("POKEPAGE_API_URL") {
      config.api.base_url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pokepage.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pokepage").join("config.yaml");
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
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  fn validate(&self) -> Result<()> {
    if self.paging.page_size == 0 {
      return Err(eyre!("paging.page_size must be at least 1"));
    }
    if self.api.max_concurrent_details == 0 {
      return Err(eyre!("api.max_concurrent_details must be at least 1"));
    }
    if self.cache.ttl_hours < 0 {
      return Err(eyre!("cache.ttl_hours must not be negative"));
    }
    if chrono::Duration::try_hours(self.cache.ttl_hours).is_none() {
      return Err(eyre!(
        "cache.ttl_hours is too large: {}",
        self.cache.ttl_hours
      ));
    }
    self.api.base_url()?;
    Ok(())
  }
}
