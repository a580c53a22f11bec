use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub devops: DevOpsConfig,
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
  #[serde(default)]
  pub tenants: Vec<TenantEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevOpsConfig {
  /// Organization name, the first path segment of every upstream URL
  pub organization: String,
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Per-call upstream timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl DevOpsConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

fn default_base_url() -> String {
  "https://dev.azure.com".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: default_bind(),
    }
  }
}

fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 3001))
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
  #[serde(default = "default_max_entries")]
  pub max_entries: usize,
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.ttl_secs)
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
      max_entries: default_max_entries(),
    }
  }
}

fn default_ttl_secs() -> u64 {
  600
}

fn default_max_entries() -> usize {
  500
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
  /// Write daily-rotated log files here instead of stdout
  pub directory: Option<PathBuf>,
}

/// A tenant as declared in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantEntry {
  pub slug: String,
  pub project: String,
  pub team: String,
  /// Hex SHA-256 of the tenant's API token (case-insensitive)
  #[serde(deserialize_with = "deserialize_lowercase")]
  pub token_sha256: String,
}

fn deserialize_lowercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let v = String::deserialize(deserializer)?;
  Ok(v.trim().to_lowercase())
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sprintdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sprintdeck/config.yaml
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
        "No configuration file found. Create one at ~/.config/sprintdeck/config.yaml\n\
                 See sprintdeck.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("sprintdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sprintdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config = Self::parse(&contents)
      .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse config: {}", e))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.devops.organization.trim().is_empty() {
      return Err(eyre!("devops.organization must not be empty"));
    }
    if self.cache.max_entries == 0 {
      return Err(eyre!("cache.max_entries must be at least 1"));
    }

    let mut slugs = BTreeSet::new();
    let mut hashes = BTreeSet::new();
    for tenant in &self.tenants {
      if !slugs.insert(tenant.slug.as_str()) {
        return Err(eyre!("Duplicate tenant slug: {}", tenant.slug));
      }
      if tenant.token_sha256.len() != 64 || hex::decode(&tenant.token_sha256).is_err() {
        return Err(eyre!(
          "Tenant {} has an invalid token_sha256 (expected 64 hex characters)",
          tenant.slug
        ));
      }
      // Each token must identify exactly one tenant
      if !hashes.insert(tenant.token_sha256.as_str()) {
        return Err(eyre!(
          "Tenant {} reuses another tenant's token_sha256",
          tenant.slug
        ));
      }
    }

    Ok(())
  }

  /// Get the Azure DevOps personal access token from environment variables.
  ///
  /// Checks SPRINTDECK_DEVOPS_PAT first, then AZURE_DEVOPS_PAT as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("SPRINTDECK_DEVOPS_PAT")
      .or_else(|_| std::env::var("AZURE_DEVOPS_PAT"))
      .map_err(|_| {
        eyre!(
          "Azure DevOps token not found. Set SPRINTDECK_DEVOPS_PAT or AZURE_DEVOPS_PAT environment variable."
        )
      })
  }
}
