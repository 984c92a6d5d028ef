//! Resilient receipt store.
//!
//! [`ReceiptStore`] wraps a [`KvBackend`] and gives every operation the same
//! discipline:
//!
//! - each attempt is bounded by `min(now + attempt_timeout, deadline)`, where
//!   `deadline` belongs to the caller's request;
//! - an attempt that exceeds its bound is retried, up to `max_retries`
//!   attempts in total;
//! - any other backend failure is returned immediately;
//! - once the caller's deadline has passed no further attempt is made.
//!
//! Expiry is the backend's job. The store only passes the configured TTL
//! along with every write.

use crate::config::Config;
use crate::errors::{BackendError, StoreError};
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Minimal key-value operations the receipt store needs from a backend.
///
/// Implementations must be safe to share between concurrent requests.
pub trait KvBackend: Send + Sync {
    /// Fetch a value. `Ok(None)` means the key is absent or expired.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, BackendError>> + Send;

    /// Write a value that the backend forgets after `ttl`.
    fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Cheap liveness probe.
    fn ping(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Timeout, TTL and retry ceiling applied by [`ReceiptStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    pub attempt_timeout: Duration,
    pub ttl: Duration,
    pub max_retries: u32,
}

impl From<&Config> for StoreSettings {
    fn from(config: &Config) -> Self {
        Self {
            attempt_timeout: config.store_timeout,
            ttl: config.record_ttl,
            max_retries: config.max_store_retries,
        }
    }
}

/// Deadline-bounded, retrying wrapper around a [`KvBackend`].
pub struct ReceiptStore<B> {
    backend: B,
    settings: StoreSettings,
}

impl<B: KvBackend> ReceiptStore<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self::with_settings(backend, StoreSettings::from(config))
    }

    pub fn with_settings(backend: B, settings: StoreSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Store `value` under `key` with the configured TTL.
    pub async fn put(&self, deadline: Instant, key: &str, value: &str) -> Result<(), StoreError> {
        let ttl = self.settings.ttl;
        self.with_retries("put", key, deadline, || {
            self.backend.set_with_ttl(key, value, ttl)
        })
        .await
    }

    /// Fetch the value stored under `key`.
    ///
    /// A missing or expired key is reported as [`StoreError::NotFound`] on the
    /// first attempt and never retried.
    pub async fn get(&self, deadline: Instant, key: &str) -> Result<String, StoreError> {
        match self
            .with_retries("get", key, deadline, || self.backend.get(key))
            .await?
        {
            Some(value) => Ok(value),
            None => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    /// Single bounded liveness probe. Not retried.
    pub async fn ping(&self, deadline: Instant) -> Result<(), StoreError> {
        let bound = deadline.min(Instant::now() + self.settings.attempt_timeout);
        match timeout_at(bound, self.backend.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(BackendError::DeadlineExceeded)) | Err(_) => {
                Err(StoreError::Unavailable { attempts: 1 })
            }
            Ok(Err(BackendError::Failed(msg))) => Err(StoreError::Backend(msg)),
        }
    }

    async fn with_retries<T, F, Fut>(
        &self,
        op: &'static str,
        key: &str,
        deadline: Instant,
        mut attempt: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let max_retries = self.settings.max_retries;

        for n in 1..=max_retries {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    "Store {} for {} abandoned: caller deadline passed after {} attempt(s)",
                    op,
                    key,
                    n - 1
                );
                return Err(StoreError::Unavailable { attempts: n - 1 });
            }

            let bound = deadline.min(now + self.settings.attempt_timeout);
            match timeout_at(bound, attempt()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(BackendError::DeadlineExceeded)) | Err(_) => {
                    tracing::warn!(
                        "Store {} for {} timed out, attempt {}/{}",
                        op,
                        key,
                        n,
                        max_retries
                    );
                }
                Ok(Err(BackendError::Failed(msg))) => {
                    tracing::error!("Store {} for {} failed: {}", op, key, msg);
                    return Err(StoreError::Backend(msg));
                }
            }
        }

        tracing::error!(
            "Store {} for {} gave up after {} attempt(s)",
            op,
            key,
            max_retries
        );
        Err(StoreError::Unavailable {
            attempts: max_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Backend that replays a fixed list of outcomes, one per call.
    struct Replay {
        outcomes: Mutex<VecDeque<Result<Option<String>, BackendError>>>,
        calls: AtomicU32,
    }

    impl Replay {
        fn new(outcomes: Vec<Result<Option<String>, BackendError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn next(&self) -> Result<Option<String>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(BackendError::DeadlineExceeded))
        }
    }

    impl KvBackend for Replay {
        async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
            self.next()
        }

        async fn set_with_ttl(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Duration,
        ) -> Result<(), BackendError> {
            self.next().map(|_| ())
        }

        async fn ping(&self) -> Result<(), BackendError> {
            self.next().map(|_| ())
        }
    }

    fn store(outcomes: Vec<Result<Option<String>, BackendError>>) -> ReceiptStore<Replay> {
        ReceiptStore::with_settings(
            Replay::new(outcomes),
            StoreSettings {
                attempt_timeout: Duration::from_millis(200),
                ttl: Duration::from_secs(60),
                max_retries: 3,
            },
        )
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_get_recovers_after_timeouts() {
        let store = store(vec![
            Err(BackendError::DeadlineExceeded),
            Err(BackendError::DeadlineExceeded),
            Ok(Some("28".to_string())),
        ]);

        assert_eq!(store.get(far_deadline(), "id").await, Ok("28".to_string()));
        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let store = store(vec![Ok(None)]);

        assert_eq!(
            store.get(far_deadline(), "id").await,
            Err(StoreError::NotFound {
                key: "id".to_string()
            })
        );
        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_put_gives_up_after_max_retries() {
        let store = store(vec![]);

        assert_eq!(
            store.put(far_deadline(), "id", "28").await,
            Err(StoreError::Unavailable { attempts: 3 })
        );
        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_ping_is_single_attempt() {
        let store = store(vec![Err(BackendError::Failed("refused".to_string()))]);

        assert_eq!(
            store.ping(far_deadline()).await,
            Err(StoreError::Backend("refused".to_string()))
        );
        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_deadline_makes_no_attempt() {
        let store = store(vec![Ok(Some("28".to_string()))]);

        assert_eq!(
            store.get(Instant::now(), "id").await,
            Err(StoreError::Unavailable { attempts: 0 })
        );
        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 0);
    }
}
