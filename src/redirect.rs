use chrono::Utc;
use std::sync::Arc;

use crate::analytics::{compute_stats, LinkStats};
use crate::client::VisitorContext;
use crate::error::{RedirectError, Result};
use crate::geo::GeoService;
use crate::metrics::MetricsCollector;
use crate::models::{Link, NewClick};
use crate::password::password_matches;
use crate::response::RedirectOutcome;
use crate::store::LinkStore;
use crate::validation::RequestValidator;

/// Resolves short codes and records clicks
pub struct RedirectService {
    store: Arc<dyn LinkStore>,
    geo: GeoService,
    metrics: MetricsCollector,
    record_before_password: bool,
}

impl RedirectService {
    pub fn new(
        store: Arc<dyn LinkStore>,
        geo: GeoService,
        metrics: MetricsCollector,
        record_before_password: bool,
    ) -> Self {
        Self {
            store,
            geo,
            metrics,
            record_before_password,
        }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Resolves a redirect request and counts its outcome
    pub async fn handle(
        &self,
        raw_short_code: &str,
        password: Option<&str>,
        visitor: &VisitorContext,
    ) -> Result<RedirectOutcome> {
        let result = self.resolve(raw_short_code, password, visitor).await;

        let outcome = match &result {
            Ok(outcome) => outcome.label(),
            Err(err) => err.outcome(),
        };
        self.metrics.record_outcome(outcome).await;
        tracing::info!(short_code = %raw_short_code, outcome = outcome, "Redirect resolved");

        result
    }

    async fn resolve(
        &self,
        raw_short_code: &str,
        password: Option<&str>,
        visitor: &VisitorContext,
    ) -> Result<RedirectOutcome> {
        let short_code = RequestValidator::short_code(raw_short_code)?;

        let link = self
            .store
            .find_active_link(&short_code)
            .await?
            .ok_or(RedirectError::NotFound)?;

        if link.is_expired(Utc::now()) {
            return Err(RedirectError::Expired);
        }

        if self.record_before_password {
            self.record_click(&link, visitor).await;
        }

        if let Some(stored) = link.required_password() {
            if !password_matches(stored, password).await {
                return Ok(RedirectOutcome::PasswordRequired { short_code });
            }
        }

        if !self.record_before_password {
            self.record_click(&link, visitor).await;
        }

        Ok(RedirectOutcome::Redirect {
            location: link.original_url,
        })
    }

    /// Records one click. Failures are logged and never reach the visitor.
    async fn record_click(&self, link: &Link, visitor: &VisitorContext) {
        let location = self.geo.lookup(visitor.ip).await;
        let device = visitor.device_info();

        let click = NewClick {
            link_id: link.id,
            ip_address: visitor.ip.map(|ip| ip.to_string()),
            country: location.country,
            city: location.city,
            device: Some(device.device.to_string()),
            browser: Some(device.browser.to_string()),
            os: Some(device.os.to_string()),
            referrer: visitor.referrer.clone(),
        };

        match self.store.record_click(click).await {
            Ok(count) => {
                tracing::debug!(short_code = %link.short_code, clicks = count, "Click recorded");
                self.metrics.record_click(true).await;
            }
            Err(e) => {
                tracing::warn!(short_code = %link.short_code, error = %e, "Failed to record click");
                self.metrics.record_click(false).await;
            }
        }
    }

    /// Click statistics for an active link
    pub async fn stats(&self, raw_short_code: &str) -> Result<LinkStats> {
        let short_code = RequestValidator::short_code(raw_short_code)?;
        let link = self
            .store
            .find_active_link(&short_code)
            .await?
            .ok_or(RedirectError::NotFound)?;

        let clicks = self.store.clicks_for_link(link.id).await?;
        Ok(compute_stats(&short_code, link.click_count(), &clicks, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GeoCache;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::time::Duration as StdDuration;
    use uuid::Uuid;

    fn link(code: &str) -> Link {
        Link {
            id: Uuid::new_v4(),
            short_code: code.to_string(),
            original_url: "https://example.com/target".to_string(),
            title: None,
            description: None,
            password: None,
            expires_at: None,
            is_active: Some(true),
            clicks: Some(0),
            user_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn service(store: MemoryStore, record_before_password: bool) -> RedirectService {
        let geo = GeoService::disabled(GeoCache::in_memory(StdDuration::from_secs(60)));
        RedirectService::new(Arc::new(store), geo, MetricsCollector::new(), record_before_password)
    }

    fn visitor() -> VisitorContext {
        VisitorContext {
            ip: Some("198.51.100.7".parse().unwrap()),
            user_agent: "Mozilla/5.0 (Windows NT 10.0) Chrome/120.0".to_string(),
            referrer: None,
        }
    }

    #[tokio::test]
    async fn test_redirects_and_records_click() {
        let link = link("go");
        let store = MemoryStore::with_links([link.clone()]);
        let service = service(store.clone(), true);

        let outcome = service.handle("go", None, &visitor()).await.unwrap();
        assert_eq!(
            outcome,
            RedirectOutcome::Redirect {
                location: "https://example.com/target".to_string()
            }
        );

        let clicks = store.all_clicks().await;
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].ip_address.as_deref(), Some("198.51.100.7"));
        assert_eq!(clicks[0].browser.as_deref(), Some("Chrome"));
        assert_eq!(store.link(link.id).await.unwrap().clicks, Some(1));
    }

    #[tokio::test]
    async fn test_expired_link_records_nothing() {
        let mut link = link("old");
        link.expires_at = Some(Utc::now() - Duration::minutes(1));
        let store = MemoryStore::with_links([link]);
        let service = service(store.clone(), true);

        let err = service.handle("old", None, &visitor()).await.unwrap_err();
        assert!(matches!(err, RedirectError::Expired));
        assert!(store.all_clicks().await.is_empty());
    }

    #[tokio::test]
    async fn test_password_prompt_still_counts_click_by_default() {
        let mut link = link("secret");
        link.password = Some("open-sesame".to_string());
        let store = MemoryStore::with_links([link]);
        let service = service(store.clone(), true);

        let outcome = service.handle("secret", None, &visitor()).await.unwrap();
        assert_eq!(
            outcome,
            RedirectOutcome::PasswordRequired {
                short_code: "secret".to_string()
            }
        );
        assert_eq!(store.all_clicks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_password_prompt_without_click_when_recording_after_gate() {
        let mut link = link("secret");
        link.password = Some("open-sesame".to_string());
        let store = MemoryStore::with_links([link]);
        let service = service(store.clone(), false);

        service.handle("secret", Some("nope"), &visitor()).await.unwrap();
        assert!(store.all_clicks().await.is_empty());

        let outcome = service
            .handle("secret", Some("open-sesame"), &visitor())
            .await
            .unwrap();
        assert!(matches!(outcome, RedirectOutcome::Redirect { .. }));
        assert_eq!(store.all_clicks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_outcomes_are_counted() {
        let store = MemoryStore::with_links([link("go")]);
        let service = service(store, true);

        service.handle("go", None, &visitor()).await.unwrap();
        let _ = service.handle("missing", None, &visitor()).await;
        let _ = service.handle("", None, &visitor()).await;

        let metrics = service.metrics().snapshot().await;
        assert_eq!(metrics.outcomes["redirected"], 1);
        assert_eq!(metrics.outcomes["not_found"], 1);
        assert_eq!(metrics.outcomes["bad_request"], 1);
        assert_eq!(metrics.clicks_recorded, 1);
    }

    #[tokio::test]
    async fn test_stats_for_link() {
        let link = link("go");
        let store = MemoryStore::with_links([link]);
        let service = service(store, true);

        service.handle("go", None, &visitor()).await.unwrap();
        service.handle("go", None, &visitor()).await.unwrap();

        let stats = service.stats("go").await.unwrap();
        assert_eq!(stats.total_clicks, 2);
        assert_eq!(stats.unique_clicks, 1);
        assert_eq!(stats.stored_clicks, 2);
        assert_eq!(stats.clicks_today, 2);
    }
}
