use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::cache::GeoCache;
use crate::store::LinkStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: DependencyStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub backend: ServiceStatus,
    pub geo_cache: ServiceStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub kind: String,
    pub status: String,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

impl ServiceStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

static START_TIME: std::sync::LazyLock<SystemTime> = std::sync::LazyLock::new(SystemTime::now);

#[derive(Clone)]
pub struct HealthChecker {
    store: Arc<dyn LinkStore>,
    cache: GeoCache,
}

impl HealthChecker {
    pub fn new(store: Arc<dyn LinkStore>, cache: GeoCache) -> Self {
        // uptime counts from construction
        let _ = *START_TIME;
        Self { store, cache }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let now = SystemTime::now();
        let uptime = now.duration_since(*START_TIME).unwrap_or_default().as_secs();

        let backend = self.check_backend().await;
        let geo_cache = self.check_cache().await;

        // cache outages do not degrade the service
        let overall_status = if backend.is_healthy() {
            "healthy"
        } else {
            "degraded"
        };

        HealthStatus {
            status: overall_status.to_string(),
            timestamp: now
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime,
            dependencies: DependencyStatus { backend, geo_cache },
        }
    }

    pub async fn check_backend(&self) -> ServiceStatus {
        let start = Instant::now();
        let result = self.store.ping().await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => ServiceStatus {
                kind: self.store.name().to_string(),
                status: "healthy".to_string(),
                response_time_ms,
                error: None,
            },
            Err(e) => ServiceStatus {
                kind: self.store.name().to_string(),
                status: "unavailable".to_string(),
                response_time_ms,
                error: Some(e.to_string()),
            },
        }
    }

    async fn check_cache(&self) -> ServiceStatus {
        let start = Instant::now();
        let available = self.cache.is_available().await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        ServiceStatus {
            kind: self.cache.backend_name().to_string(),
            status: if available { "healthy" } else { "unavailable" }.to_string(),
            response_time_ms,
            error: (!available).then(|| "Cache not reachable".to_string()),
        }
    }
}
