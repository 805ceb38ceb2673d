use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    /// Base used for share links. When unset the link is built from the
    /// request's Host header.
    pub public_base_url: Option<String>,
    pub frontend: FrontendConfig,
    pub lifecycle: LifecycleConfig,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
    pub memory_max_entries: u64,
    /// Seconds between expiry sweeps. Zero disables the sweeper.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Path to directory containing static frontend files
    /// If None, uses embedded frontend
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Use the atomic increment-if-under-limit primitive so a paste is never
    /// served more than `max_views` times, even under concurrent reads.
    pub strict_view_limit: bool,
    /// Honour the `x-mayfly-now-ms` request header. Test configurations only.
    pub allow_clock_override: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            strict_view_limit: true,
            allow_clock_override: false,
        }
    }
}

impl StorageConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_MEMORY_MAX_ENTRIES: u64 = 100_000;
    pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
}

impl Config {
    pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "memory".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "memory" | "mem" => StorageBackend::Memory,
            "sqlite" => StorageBackend::Sqlite,
            "postgres" | "postgresql" => StorageBackend::Postgres,
            other => {
                tracing::warn!(
                    "Unknown STORAGE_BACKEND '{other}', falling back to 'memory'. Supported values: memory, sqlite, postgres"
                );
                StorageBackend::Memory
            }
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./mayfly.db?mode=rwc".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?
            .unwrap_or(StorageConfig::DEFAULT_MAX_CONNECTIONS);

        let memory_max_entries = std::env::var("MEMORY_MAX_ENTRIES")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("MEMORY_MAX_ENTRIES must be a positive integer")?
            .unwrap_or(StorageConfig::DEFAULT_MEMORY_MAX_ENTRIES);

        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(StorageConfig::DEFAULT_SWEEP_INTERVAL_SECS);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|v| v.trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        let frontend_static_dir = std::env::var("FRONTEND_STATIC_DIR").ok();

        let strict_view_limit = std::env::var("STRICT_VIEW_LIMIT")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let allow_clock_override = std::env::var("ALLOW_CLOCK_OVERRIDE")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        let max_body_bytes = std::env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(Self::DEFAULT_MAX_BODY_BYTES);

        Ok(Config {
            storage: StorageConfig {
                backend,
                url: database_url,
                max_connections,
                memory_max_entries,
                sweep_interval_secs,
            },
            server: ServerConfig { host, port },
            public_base_url,
            frontend: FrontendConfig {
                static_dir: frontend_static_dir,
            },
            lifecycle: LifecycleConfig {
                strict_view_limit,
                allow_clock_override,
            },
            max_body_bytes,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
