use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use super::LinkStore;
use crate::error::RedirectError;
use crate::models::{Click, Link, NewClick};

/// Link store backed by the hosted backend's PostgREST API.
///
/// Requests authenticate with the service-role key, which bypasses row-level
/// security; the service only ever reads links by short code and writes
/// clicks through the `record_click` stored function.
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    page_size: usize,
}

/// Rows requested per page. PostgREST caps responses at its `max-rows`
/// setting, 1000 by default.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Arguments of the `record_click` stored function
#[derive(Debug, Serialize)]
struct RecordClickArgs<'a> {
    p_link_id: Uuid,
    p_ip_address: Option<&'a str>,
    p_country: Option<&'a str>,
    p_city: Option<&'a str>,
    p_device: Option<&'a str>,
    p_browser: Option<&'a str>,
    p_os: Option<&'a str>,
    p_referrer: Option<&'a str>,
}

impl<'a> From<&'a NewClick> for RecordClickArgs<'a> {
    fn from(click: &'a NewClick) -> Self {
        Self {
            p_link_id: click.link_id,
            p_ip_address: click.ip_address.as_deref(),
            p_country: click.country.as_deref(),
            p_city: click.city.as_deref(),
            p_device: click.device.as_deref(),
            p_browser: click.browser.as_deref(),
            p_os: click.os.as_deref(),
            p_referrer: click.referrer.as_deref(),
        }
    }
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_role_key: &str, timeout: Duration) -> Result<Self, RedirectError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_role_key)
            .map_err(|_| RedirectError::Config("Service role key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", service_role_key))
            .map_err(|_| RedirectError::Config("Service role key is not a valid header value".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RedirectError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Overrides the page size used when listing clicks. Must not exceed the
    /// server's `max-rows`.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    async fn check(response: Response, what: &str) -> Result<Response, RedirectError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RedirectError::Backend(format!(
            "{} failed with status {}: {}",
            what, status, body
        )))
    }
}

#[async_trait]
impl LinkStore for SupabaseStore {
    async fn find_active_link(&self, short_code: &str) -> Result<Option<Link>, RedirectError> {
        let response = self
            .client
            .get(format!("{}/links", self.rest_url))
            .query(&[
                ("select", "*".to_string()),
                ("short_code", format!("eq.{}", short_code)),
                ("is_active", "eq.true".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;

        let links: Vec<Link> = Self::check(response, "Link lookup").await?.json().await?;
        Ok(links.into_iter().next())
    }

    async fn record_click(&self, click: NewClick) -> Result<i64, RedirectError> {
        let response = self
            .client
            .post(format!("{}/rpc/record_click", self.rest_url))
            .json(&RecordClickArgs::from(&click))
            .send()
            .await?;

        let count: i64 = Self::check(response, "Click insert").await?.json().await?;
        Ok(count)
    }

    async fn clicks_for_link(&self, link_id: Uuid) -> Result<Vec<Click>, RedirectError> {
        let mut clicks = Vec::new();

        loop {
            let response = self
                .client
                .get(format!("{}/clicks", self.rest_url))
                .query(&[
                    ("select", "*".to_string()),
                    ("link_id", format!("eq.{}", link_id)),
                    ("order", "clicked_at.desc,id.desc".to_string()),
                    ("limit", self.page_size.to_string()),
                    ("offset", clicks.len().to_string()),
                ])
                .send()
                .await?;

            let page: Vec<Click> = Self::check(response, "Click query").await?.json().await?;
            let last_page = page.len() < self.page_size;
            clicks.extend(page);
            if last_page {
                break;
            }
        }

        Ok(clicks)
    }

    async fn ping(&self) -> Result<(), RedirectError> {
        let response = self
            .client
            .get(format!("{}/links", self.rest_url))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;

        Self::check(response, "Ping").await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}
