//! 应用运行配置加载。

use std::env;
use std::str::FromStr;

/// tick 间隔允许范围（毫秒）。
pub const TICK_INTERVAL_MIN_MS: u64 = 1_000;
pub const TICK_INTERVAL_MAX_MS: u64 = 60_000;

/// 重订阅退避上限（毫秒）。
pub const RESUBSCRIBE_BACKOFF_LIMIT_MS: u64 = 600_000;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 状态存储后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "redis" => Ok(StoreBackend::Redis),
            _ => Err(()),
        }
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub redis_url: String,
    pub tick_interval_ms: u64,
    pub resubscribe_backoff_ms: u64,
    pub resubscribe_max_backoff_ms: u64,
    pub seed_registry: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr =
            env::var("MAILROOM_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let store_backend = match env::var("MAILROOM_STORE") {
            Ok(value) => value
                .parse::<StoreBackend>()
                .map_err(|_| ConfigError::Invalid("MAILROOM_STORE".to_string(), value))?,
            Err(_) => StoreBackend::Memory,
        };
        let database_url = read_optional("MAILROOM_DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("MAILROOM_DATABASE_URL".to_string()));
        }
        let redis_url = env::var("MAILROOM_REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let tick_interval_ms = read_u64_with_default("MAILROOM_TICK_INTERVAL_MS", 1_000)?;
        if !(TICK_INTERVAL_MIN_MS..=TICK_INTERVAL_MAX_MS).contains(&tick_interval_ms) {
            return Err(ConfigError::Invalid(
                "MAILROOM_TICK_INTERVAL_MS".to_string(),
                tick_interval_ms.to_string(),
            ));
        }
        let resubscribe_backoff_ms =
            read_u64_with_default("MAILROOM_RESUBSCRIBE_BACKOFF_MS", 1_000)?;
        if !(1..=RESUBSCRIBE_BACKOFF_LIMIT_MS).contains(&resubscribe_backoff_ms) {
            return Err(ConfigError::Invalid(
                "MAILROOM_RESUBSCRIBE_BACKOFF_MS".to_string(),
                resubscribe_backoff_ms.to_string(),
            ));
        }
        let resubscribe_max_backoff_ms =
            read_u64_with_default("MAILROOM_RESUBSCRIBE_MAX_BACKOFF_MS", 30_000)?;
        if resubscribe_max_backoff_ms > RESUBSCRIBE_BACKOFF_LIMIT_MS {
            return Err(ConfigError::Invalid(
                "MAILROOM_RESUBSCRIBE_MAX_BACKOFF_MS".to_string(),
                resubscribe_max_backoff_ms.to_string(),
            ));
        }
        let resubscribe_max_backoff_ms = resubscribe_max_backoff_ms.max(resubscribe_backoff_ms);
        let seed_registry = read_bool_with_default("MAILROOM_SEED_REGISTRY", true);

        Ok(Self {
            http_addr,
            store_backend,
            database_url,
            redis_url,
            tick_interval_ms,
            resubscribe_backoff_ms,
            resubscribe_max_backoff_ms,
            seed_registry,
        })
    }
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
