use std::path::PathBuf;

use common::{ImagingConfig, StorageConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8127
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://podium.db?mode=rwc".into()
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

/// Legacy import settings.
#[derive(Debug, Deserialize, Clone)]
pub struct MigrationConfig {
    /// Directory holding `teams.json`, `judges.json` and the flat files.
    #[serde(default = "default_legacy_dir")]
    pub legacy_dir: PathBuf,
    /// Base directory that relative legacy image paths resolve against.
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
}

fn default_legacy_dir() -> PathBuf {
    PathBuf::from("./db")
}
fn default_asset_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            legacy_dir: default_legacy_dir(),
            asset_root: default_asset_root(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub imaging: ImagingConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PODIUM_CONFIG").unwrap_or_else(|_| "config/config".into());
        let s = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Load from config/config.toml
            .add_source(File::with_name(&path).required(false))
            // Override from environment (e.g., PODIUM__IMAGING__MAX_DIMENSION)
            .add_source(Environment::with_prefix("PODIUM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
