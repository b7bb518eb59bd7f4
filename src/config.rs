use anyhow::{Context, Result};

// ============================================================================
// Runtime Configuration
// ============================================================================

/// Service configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Endpoint of the product validation service
    pub product_service_url: String,
    /// Port for the /metrics and /health HTTP server
    pub metrics_port: u16,
    /// Connection pool size
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            product_service_url: std::env::var("PRODUCT_SERVICE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:50051".to_string()),
            metrics_port: env_parsed("METRICS_PORT", 9090)?,
            db_max_connections: env_parsed("DB_MAX_CONNECTIONS", 5)?,
        })
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("{key} has invalid value '{value}'")),
        Err(_) => Ok(default),
    }
}
