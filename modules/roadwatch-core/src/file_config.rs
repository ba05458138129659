use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// TOML-backed configuration loaded from disk.
/// Secrets (API keys, DB URL) stay as env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-call timeout applied to every source.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Minimum delay between two calls to the same HTTP source. 0 disables.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default)]
    pub base: BaseSourceConfig,
    /// Optional sources. Declaration order is the tie-break priority.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl GeocodingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseSourceConfig {
    #[serde(default = "default_base_id")]
    pub id: String,
    #[serde(default = "default_base_url")]
    pub url: String,
}

impl Default for BaseSourceConfig {
    fn default() -> Self {
        Self {
            id: default_base_id(),
            url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    CodigosPostales {
        id: String,
        url: Option<String>,
    },
    MexicoPostal {
        id: String,
        url: Option<String>,
        host: Option<String>,
    },
    /// Fixed neighborhood -> postal code table. Keys are matched after
    /// name normalization.
    StaticTable {
        id: String,
        table: BTreeMap<String, String>,
        state: Option<String>,
    },
}

impl SourceConfig {
    pub fn id(&self) -> &str {
        match self {
            SourceConfig::CodigosPostales { id, .. }
            | SourceConfig::MexicoPostal { id, .. }
            | SourceConfig::StaticTable { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

fn default_locale() -> String {
    "es".to_string()
}

fn default_user_agent() -> String {
    "LocalizadorColonias/1.0".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_throttle_ms() -> u64 {
    1_000
}

fn default_base_id() -> String {
    "nominatim".to_string()
}

fn default_base_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_top_n() -> usize {
    10
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(content)?;
    let mut seen = std::collections::HashSet::new();
    for source in &config.geocoding.sources {
        if !seen.insert(source.id()) {
            anyhow::bail!("duplicate geocoding source id: {}", source.id());
        }
    }
    Ok(config)
}
