use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectMetrics {
    pub total_requests: u64,
    pub outcomes: BTreeMap<String, u64>,
    pub clicks_recorded: u64,
    pub click_failures: u64,
    pub since: u64,
}

impl Default for RedirectMetrics {
    fn default() -> Self {
        Self {
            total_requests: 0,
            outcomes: BTreeMap::new(),
            clicks_recorded: 0,
            click_failures: 0,
            since: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<RedirectMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_outcome(&self, outcome: &str) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;
        *metrics.outcomes.entry(outcome.to_string()).or_default() += 1;
    }

    pub async fn record_click(&self, recorded: bool) {
        let mut metrics = self.metrics.write().await;
        if recorded {
            metrics.clicks_recorded += 1;
        } else {
            metrics.click_failures += 1;
        }
    }

    pub async fn snapshot(&self) -> RedirectMetrics {
        self.metrics.read().await.clone()
    }
}
