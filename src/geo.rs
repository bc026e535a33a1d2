//! Best-effort IP geolocation for click records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::GeoCache;
use crate::error::RedirectError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
}

/// A geolocation provider.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    async fn locate(&self, ip: IpAddr) -> Result<GeoLocation, RedirectError>;
}

/// Client for ipapi.co and compatible services (`GET {base}/{ip}/json/`).
pub struct IpApiLocator {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

impl IpApiLocator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RedirectError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RedirectError::Geo(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn locate(&self, ip: IpAddr) -> Result<GeoLocation, RedirectError> {
        let url = format!("{}/{}/json/", self.base_url, ip);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RedirectError::Geo(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RedirectError::Geo(format!(
                "Lookup returned status {}",
                response.status()
            )));
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| RedirectError::Geo(format!("Invalid lookup response: {}", e)))?;

        if body.error {
            return Err(RedirectError::Geo(
                body.reason.unwrap_or_else(|| "Lookup failed".to_string()),
            ));
        }

        Ok(GeoLocation {
            country: body.country_name.filter(|c| !c.is_empty()),
            city: body.city.filter(|c| !c.is_empty()),
        })
    }
}

/// Geolocation with caching in front of the provider. Never fails.
#[derive(Clone)]
pub struct GeoService {
    locator: Option<Arc<dyn GeoLocator>>,
    cache: GeoCache,
}

impl GeoService {
    pub fn new(locator: Arc<dyn GeoLocator>, cache: GeoCache) -> Self {
        Self {
            locator: Some(locator),
            cache,
        }
    }

    pub fn disabled(cache: GeoCache) -> Self {
        Self {
            locator: None,
            cache,
        }
    }

    pub fn cache(&self) -> &GeoCache {
        &self.cache
    }

    pub async fn lookup(&self, ip: Option<IpAddr>) -> GeoLocation {
        let (Some(locator), Some(ip)) = (&self.locator, ip) else {
            return GeoLocation::default();
        };

        if !is_public(&ip) {
            return GeoLocation::default();
        }

        let key = ip.to_string();
        match self.cache.get(&key).await {
            Ok(Some(location)) => return location,
            Ok(None) => {}
            Err(e) => tracing::warn!(ip = %key, error = %e, "Geo cache read failed"),
        }

        match locator.locate(ip).await {
            Ok(location) => {
                if let Err(e) = self.cache.put(&key, &location).await {
                    tracing::warn!(ip = %key, error = %e, "Geo cache write failed");
                }
                location
            }
            Err(e) => {
                tracing::debug!(ip = %key, error = %e, "Geolocation lookup failed");
                GeoLocation::default()
            }
        }
    }
}

fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            let unique_local = (v6.segments()[0] & 0xfe00) == 0xfc00;
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}
