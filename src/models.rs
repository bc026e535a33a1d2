//! Row shapes of the `links` and `clicks` tables as the REST API returns them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shortened link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: Uuid,
    pub short_code: String,
    pub original_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub clicks: Option<i64>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Link {
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(false)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at < now)
    }

    /// Stored password, if the link is protected. Empty strings do not count.
    pub fn required_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn click_count(&self) -> i64 {
        self.clicks.unwrap_or(0)
    }
}

/// Click about to be recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewClick {
    pub link_id: Uuid,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub referrer: Option<String>,
}

/// A recorded click.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Click {
    pub id: Uuid,
    #[serde(default)]
    pub link_id: Option<Uuid>,
    pub clicked_at: DateTime<Utc>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

impl Click {
    pub fn from_new(click: NewClick, clicked_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            link_id: Some(click.link_id),
            clicked_at,
            ip_address: click.ip_address,
            country: click.country,
            city: click.city,
            device: click.device,
            browser: click.browser,
            os: click.os,
            referrer: click.referrer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link() -> Link {
        serde_json::from_value(serde_json::json!({
            "id": "6f1c1f9e-8d5e-4b2a-9c8f-0d1e2f3a4b5c",
            "short_code": "abc123",
            "original_url": "https://example.com"
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_columns_use_defaults() {
        let link = link();
        assert!(!link.is_active());
        assert_eq!(link.click_count(), 0);
        assert!(link.required_password().is_none());
        assert!(!link.is_expired(Utc::now()));
    }

    #[test]
    fn test_expiry_is_strictly_in_the_past() {
        let now = Utc::now();
        let mut link = link();

        link.expires_at = Some(now - Duration::seconds(1));
        assert!(link.is_expired(now));

        link.expires_at = Some(now);
        assert!(!link.is_expired(now));
    }

    #[test]
    fn test_empty_password_is_not_protection() {
        let mut link = link();
        link.password = Some(String::new());
        assert!(link.required_password().is_none());

        link.password = Some("hunter2".to_string());
        assert_eq!(link.required_password(), Some("hunter2"));
    }

    #[test]
    fn test_postgrest_timestamps_parse() {
        let link: Link = serde_json::from_value(serde_json::json!({
            "id": "6f1c1f9e-8d5e-4b2a-9c8f-0d1e2f3a4b5c",
            "short_code": "abc123",
            "original_url": "https://example.com",
            "expires_at": "2024-01-01T00:00:00+00:00",
            "is_active": true,
            "clicks": 7
        }))
        .unwrap();

        assert!(link.is_expired(Utc::now()));
        assert_eq!(link.click_count(), 7);
    }
}
