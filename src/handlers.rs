use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::cache::GeoCache;
use crate::client::VisitorContext;
use crate::config::Config;
use crate::error::RedirectError;
use crate::geo::{GeoService, IpApiLocator};
use crate::health::HealthChecker;
use crate::metrics::MetricsCollector;
use crate::redirect::RedirectService;
use crate::store::LinkStore;
use crate::validation::{RedirectQuery, RequestValidator};

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Application state containing the redirect service and its probes
pub struct AppState {
    pub service: RedirectService,
    pub health: HealthChecker,
    pub site_name: String,
    pub stats_token: Option<String>,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn LinkStore>, geo: GeoService) -> Self {
        let health = HealthChecker::new(store.clone(), geo.cache().clone());
        let service = RedirectService::new(
            store,
            geo,
            MetricsCollector::new(),
            config.record_clicks_before_password,
        );

        Self {
            service,
            health,
            site_name: config.site_name.clone(),
            stats_token: config.stats_token().map(str::to_string),
        }
    }

    /// Builds the state with the geolocation client and cache described by `config`
    pub fn from_config(config: &Config, store: Arc<dyn LinkStore>) -> Result<Self, RedirectError> {
        let cache = GeoCache::new(&config.redis_url, config.geo_cache_ttl(), config.geo_timeout())?;
        let geo = if config.geo_enabled {
            let locator = IpApiLocator::new(&config.geo_api_url, config.geo_timeout())?;
            GeoService::new(Arc::new(locator), cache)
        } else {
            GeoService::disabled(cache)
        };

        Ok(Self::new(config, store, geo))
    }
}

/// Resolve a short code
pub async fn redirect(
    State(state): State<SharedState>,
    Path(short_code): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, RedirectError> {
    let query = RedirectQuery::from_pairs(pairs);
    let visitor = VisitorContext::from_headers(&headers);
    let outcome = state
        .service
        .handle(&short_code, query.password.as_deref(), &visitor)
        .await?;

    Ok(outcome.render(&state.site_name))
}

/// Requests for `/` carry no short code
pub async fn missing_short_code(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, RedirectError> {
    let visitor = VisitorContext::from_headers(&headers);
    let outcome = state.service.handle("", None, &visitor).await?;
    Ok(outcome.render(&state.site_name))
}

/// Click statistics for a link
pub async fn link_stats(
    State(state): State<SharedState>,
    Path(short_code): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, RedirectError> {
    let Some(expected) = state.stats_token.as_deref() else {
        return Err(RedirectError::NotFound);
    };

    let provided = RequestValidator::bearer_token(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    );
    if provided != Some(expected) {
        return Err(RedirectError::Unauthorized);
    }

    let stats = state.service.stats(&short_code).await?;
    Ok(Json(stats))
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.health.check_health().await)
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<SharedState>) -> impl IntoResponse {
    let backend = state.health.check_backend().await;

    if backend.is_healthy() {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "backend": backend.kind,
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "backend": backend.kind,
                "error": backend.error,
            })),
        )
    }
}

/// Redirect counters
pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.service.metrics().snapshot().await)
}
