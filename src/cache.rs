//! Expiring cache for geolocation results.
//!
//! Backed by Redis when a URL is configured, otherwise by an in-process map.
//! Every failure is reported to the caller, which treats it as a miss.

use redis::aio::MultiplexedConnection;
use redis::Client;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::RedirectError;
use crate::geo::GeoLocation;

const KEY_PREFIX: &str = "redirector:geo:";
const LOCAL_CLEANUP_THRESHOLD: usize = 10_000;

pub struct RedisCache {
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    timeout: Duration,
}

impl RedisCache {
    /// Every connect and command is bounded by `timeout`.
    pub fn new(redis_url: &str, timeout: Duration) -> Result<Self, RedirectError> {
        let client = Client::open(redis_url)
            .map_err(|e| RedirectError::Cache(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, RedirectError> {
        if let Some(conn) = self.connection.lock().await.as_ref() {
            return Ok(conn.clone());
        }

        // connect without the lock held; a concurrent connect simply wins the slot
        let conn = tokio::time::timeout(self.timeout, self.client.get_multiplexed_tokio_connection())
            .await
            .map_err(|_| RedirectError::Cache("Timed out connecting to Redis".to_string()))?
            .map_err(|e| RedirectError::Cache(format!("Failed to connect to Redis: {}", e)))?;

        *self.connection.lock().await = Some(conn.clone());
        Ok(conn)
    }

    /// Drops the cached connection so the next call reconnects.
    async fn reset(&self) {
        *self.connection.lock().await = None;
    }

    async fn query<T: redis::FromRedisValue>(
        &self,
        cmd: &redis::Cmd,
        name: &str,
    ) -> Result<T, RedirectError> {
        let mut conn = self.connection().await?;
        let result = tokio::time::timeout(self.timeout, cmd.query_async::<_, T>(&mut conn)).await;

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.reset().await;
                Err(RedirectError::Cache(format!("{} failed: {}", name, e)))
            }
            Err(_) => {
                self.reset().await;
                Err(RedirectError::Cache(format!("{} timed out", name)))
            }
        }
    }

    pub async fn ping(&self) -> Result<(), RedirectError> {
        let _: String = self.query(&redis::cmd("PING"), "PING").await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, RedirectError> {
        self.query(redis::cmd("GET").arg(key), "GET").await
    }

    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<(), RedirectError> {
        self.query(
            redis::cmd("SETEX").arg(key).arg(expiry_seconds).arg(value),
            "SETEX",
        )
        .await
    }
}

#[derive(Clone)]
struct LocalEntry {
    location: GeoLocation,
    expires: Instant,
}

#[derive(Clone)]
pub struct GeoCache {
    ttl: Duration,
    local: Arc<RwLock<HashMap<String, LocalEntry>>>,
    redis: Option<Arc<RedisCache>>,
}

impl GeoCache {
    pub fn new(redis_url: &str, ttl: Duration, timeout: Duration) -> Result<Self, RedirectError> {
        let redis = if !redis_url.is_empty() {
            Some(Arc::new(RedisCache::new(redis_url, timeout)?))
        } else {
            None
        };

        Ok(Self {
            ttl,
            local: Arc::new(RwLock::new(HashMap::new())),
            redis,
        })
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            ttl,
            local: Arc::new(RwLock::new(HashMap::new())),
            redis: None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        if self.redis.is_some() {
            "redis"
        } else {
            "memory"
        }
    }

    pub async fn get(&self, ip: &str) -> Result<Option<GeoLocation>, RedirectError> {
        if let Some(redis) = &self.redis {
            let raw = redis.get(&format!("{}{}", KEY_PREFIX, ip)).await?;
            return match raw {
                Some(raw) => serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|e| RedirectError::Cache(format!("Corrupt cache entry: {}", e))),
                None => Ok(None),
            };
        }

        let entries = self
            .local
            .read()
            .map_err(|_| RedirectError::Internal("Failed to acquire read lock on geo cache".to_string()))?;
        Ok(entries
            .get(ip)
            .filter(|entry| entry.expires > Instant::now())
            .map(|entry| entry.location.clone()))
    }

    pub async fn put(&self, ip: &str, location: &GeoLocation) -> Result<(), RedirectError> {
        if let Some(redis) = &self.redis {
            let raw = serde_json::to_string(location)
                .map_err(|e| RedirectError::Internal(format!("Failed to encode cache entry: {}", e)))?;
            return redis
                .set_with_expiry(&format!("{}{}", KEY_PREFIX, ip), &raw, self.ttl.as_secs().max(1))
                .await;
        }

        let mut entries = self
            .local
            .write()
            .map_err(|_| RedirectError::Internal("Failed to acquire write lock on geo cache".to_string()))?;
        if entries.len() >= LOCAL_CLEANUP_THRESHOLD {
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires > now);
        }
        entries.insert(
            ip.to_string(),
            LocalEntry {
                location: location.clone(),
                expires: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    /// Reports whether the cache backend is reachable. The in-process map always is.
    pub async fn is_available(&self) -> bool {
        match &self.redis {
            Some(redis) => redis.ping().await.is_ok(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berlin() -> GeoLocation {
        GeoLocation {
            country: Some("Germany".to_string()),
            city: Some("Berlin".to_string()),
        }
    }

    #[tokio::test]
    async fn test_local_roundtrip() {
        let cache = GeoCache::in_memory(Duration::from_secs(60));
        assert!(cache.get("203.0.113.9").await.unwrap().is_none());

        cache.put("203.0.113.9", &berlin()).await.unwrap();
        assert_eq!(cache.get("203.0.113.9").await.unwrap(), Some(berlin()));
        assert!(cache.get("198.51.100.1").await.unwrap().is_none());
        assert_eq!(cache.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_local_entries_expire() {
        let cache = GeoCache::in_memory(Duration::ZERO);
        cache.put("203.0.113.9", &berlin()).await.unwrap();
        assert!(cache.get("203.0.113.9").await.unwrap().is_none());
    }

    #[test]
    fn test_invalid_redis_url() {
        assert!(GeoCache::new("not a url", Duration::from_secs(60), Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_in_memory_is_always_available() {
        assert!(GeoCache::in_memory(Duration::from_secs(1)).is_available().await);
    }

    /// Accepts TCP connections and never answers, like a server behind a
    /// firewall that drops replies.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("redis://{}", addr)
    }

    #[tokio::test]
    async fn test_unresponsive_redis_times_out() {
        let url = silent_server().await;
        let cache = GeoCache::new(&url, Duration::from_secs(60), Duration::from_millis(100)).unwrap();
        assert_eq!(cache.backend_name(), "redis");

        let bounded = Duration::from_secs(5);
        let read = tokio::time::timeout(bounded, cache.get("203.0.113.9")).await;
        assert!(matches!(read, Ok(Err(RedirectError::Cache(_)))));

        let write = tokio::time::timeout(bounded, cache.put("203.0.113.9", &berlin())).await;
        assert!(matches!(write, Ok(Err(RedirectError::Cache(_)))));

        let available = tokio::time::timeout(bounded, cache.is_available()).await;
        assert!(matches!(available, Ok(false)));
    }

    #[tokio::test]
    async fn test_concurrent_reads_do_not_queue_behind_connect() {
        let url = silent_server().await;
        let cache = GeoCache::new(&url, Duration::from_secs(60), Duration::from_millis(200)).unwrap();

        let started = std::time::Instant::now();
        let reads: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get("203.0.113.9").await })
            })
            .collect();
        for read in reads {
            assert!(read.await.unwrap().is_err());
        }

        // serialised connects would take 8 x 200ms or more
        assert!(started.elapsed() < Duration::from_millis(1200));
    }
}
