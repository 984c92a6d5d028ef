use crate::cache::MemoryBackend;
use crate::config::{BackendKind, Config};
use crate::errors::BackendError;
use crate::store::KvBackend;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::RedisError;
use std::time::Duration;

/// Redis-backed key-value store.
///
/// The connection manager multiplexes every request over one connection and
/// reconnects on its own; cloning it per call is the intended usage.
#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    /// Connects to `addr`, either `host:port` or a full `redis://` URL.
    ///
    /// `timeout` bounds both connecting and every individual response.
    pub async fn connect(addr: &str, timeout: Duration) -> anyhow::Result<Self> {
        let url = if addr.starts_with("redis://") || addr.starts_with("rediss://") {
            addr.to_string()
        } else {
            format!("redis://{}", addr)
        };

        let client = redis::Client::open(url.as_str())?;
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(timeout)
            .set_response_timeout(timeout);
        let manager = ConnectionManager::new_with_config(client, manager_config).await?;

        Ok(Self { manager })
    }
}

fn classify(err: RedisError) -> BackendError {
    if err.is_timeout() {
        BackendError::DeadlineExceeded
    } else {
        BackendError::Failed(err.to_string())
    }
}

impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        cmd.query_async::<Option<String>>(&mut conn)
            .await
            .map_err(classify)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64);
        cmd.query_async::<()>(&mut conn).await.map_err(classify)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.manager.clone();
        let pong = redis::cmd("PING").query_async::<String>(&mut conn).await;
        pong.map(|_| ()).map_err(classify)
    }
}

/// The backend selected by configuration.
#[derive(Clone)]
pub enum StoreBackend {
    Redis(RedisBackend),
    Memory(MemoryBackend),
}

impl StoreBackend {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        match config.store_backend {
            BackendKind::Redis => {
                let backend = RedisBackend::connect(&config.redis_addr, config.store_timeout).await?;
                tracing::info!("Connected to Redis at {}", config.redis_addr);
                Ok(StoreBackend::Redis(backend))
            }
            BackendKind::Memory => {
                tracing::warn!("Using in-memory store; points are lost on restart");
                Ok(StoreBackend::Memory(MemoryBackend::default()))
            }
        }
    }
}

impl KvBackend for StoreBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        match self {
            StoreBackend::Redis(backend) => backend.get(key).await,
            StoreBackend::Memory(backend) => backend.get(key).await,
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BackendError> {
        match self {
            StoreBackend::Redis(backend) => backend.set_with_ttl(key, value, ttl).await,
            StoreBackend::Memory(backend) => backend.set_with_ttl(key, value, ttl).await,
        }
    }

    async fn ping(&self) -> Result<(), BackendError> {
        match self {
            StoreBackend::Redis(backend) => backend.ping().await,
            StoreBackend::Memory(backend) => backend.ping().await,
        }
    }
}
