use std::time::Duration;

/// Which key-value backend the receipt store talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Redis,
    Memory,
}

/// Process configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_addr: String,
    pub store_backend: BackendKind,
    /// Upper bound on a single store attempt.
    pub store_timeout: Duration,
    /// How long a receipt's points stay retrievable.
    pub record_ttl: Duration,
    /// Maximum number of attempts per store operation.
    pub max_store_retries: u32,
    /// Upper bound on a whole HTTP request.
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_vars(|name| std::env::var(name).ok())?;

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Redis address: {}", config.redis_addr);
        tracing::debug!("Store backend: {:?}", config.store_backend);
        tracing::debug!(
            "Store timeout: {:?}, record TTL: {:?}, max retries: {}",
            config.store_timeout,
            config.record_ttl,
            config.max_store_retries
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let positive = |name: &str, raw: String| -> anyhow::Result<u64> {
            let value: u64 = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer", name))?;
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
            Ok(value)
        };
        let required_positive = |name: &str| -> anyhow::Result<u64> {
            let raw = var(name)
                .ok_or_else(|| anyhow::anyhow!("{} environment variable required", name))?;
            positive(name, raw)
        };

        let config = Self {
            port: var("SERVER_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number between 1-65535"))?,
            redis_addr: var("REDIS_ADDR")
                .filter(|addr| !addr.trim().is_empty())
                .unwrap_or_else(|| "redis:6379".to_string()),
            store_backend: match var("STORE_BACKEND")
                .unwrap_or_else(|| "redis".to_string())
                .to_lowercase()
                .as_str()
            {
                "redis" => BackendKind::Redis,
                "memory" => BackendKind::Memory,
                other => anyhow::bail!("STORE_BACKEND must be 'redis' or 'memory', got '{}'", other),
            },
            store_timeout: Duration::from_millis(required_positive("DB_TIMEOUT_IN_MS")?),
            record_ttl: Duration::from_secs(required_positive("REDIS_TTL_IN_S")?),
            max_store_retries: u32::try_from(required_positive("MAX_DB_CONN_RETRIES")?)
                .map_err(|_| anyhow::anyhow!("MAX_DB_CONN_RETRIES is too large"))?,
            request_timeout: Duration::from_millis(positive(
                "REQUEST_TIMEOUT_IN_MS",
                var("REQUEST_TIMEOUT_IN_MS").unwrap_or_else(|| "5000".to_string()),
            )?),
        };

        Ok(config)
    }
}
