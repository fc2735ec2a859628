use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Which `DeviceStore` implementation the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sql" => Ok(Self::Sqlite),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(anyhow!("unknown store backend `{other}` (expected sqlite or memory)")),
        }
    }
}

/// Process settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub pool_size: u32,
    pub log_spec: String,
    pub log_dir: PathBuf,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let store_backend = match get("NETRUNNER_STORE") {
            Some(v) => v.parse()?,
            None => defaults.store_backend,
        };
        let pool_size = match get("NETRUNNER_POOL_SIZE") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("NETRUNNER_POOL_SIZE must be a positive integer, got `{v}`"))?,
            None => defaults.pool_size,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            store_backend,
            pool_size,
            log_spec: get("NETRUNNER_LOG").unwrap_or(defaults.log_spec),
            log_dir: get("NETRUNNER_LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
        })
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            store_backend: StoreBackend::Sqlite,
            pool_size: 8,
            log_spec: "info".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}
