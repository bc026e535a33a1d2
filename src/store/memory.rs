use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::LinkStore;
use crate::error::RedirectError;
use crate::models::{Click, Link, NewClick};

#[derive(Default)]
struct Tables {
    links: HashMap<Uuid, Link>,
    clicks: Vec<Click>,
}

/// In-process link store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(links: impl IntoIterator<Item = Link>) -> Self {
        let tables = Tables {
            links: links.into_iter().map(|link| (link.id, link)).collect(),
            clicks: Vec::new(),
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Loads links from a JSON file containing an array of link rows
    pub fn from_json_file(path: &Path) -> Result<Self, RedirectError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RedirectError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let links: Vec<Link> = serde_json::from_str(&raw).map_err(|e| {
            RedirectError::Config(format!("Invalid links file {}: {}", path.display(), e))
        })?;
        Ok(Self::with_links(links))
    }

    pub async fn link(&self, id: Uuid) -> Option<Link> {
        self.tables.read().await.links.get(&id).cloned()
    }

    pub async fn all_clicks(&self) -> Vec<Click> {
        self.tables.read().await.clicks.clone()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn find_active_link(&self, short_code: &str) -> Result<Option<Link>, RedirectError> {
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .values()
            .find(|link| link.short_code == short_code && link.is_active())
            .cloned())
    }

    async fn record_click(&self, click: NewClick) -> Result<i64, RedirectError> {
        let mut tables = self.tables.write().await;
        let link = tables
            .links
            .get_mut(&click.link_id)
            .ok_or_else(|| RedirectError::Backend(format!("Unknown link {}", click.link_id)))?;

        let count = link.click_count() + 1;
        link.clicks = Some(count);
        tables.clicks.push(Click::from_new(click, Utc::now()));
        Ok(count)
    }

    async fn clicks_for_link(&self, link_id: Uuid) -> Result<Vec<Click>, RedirectError> {
        let tables = self.tables.read().await;
        let mut clicks: Vec<Click> = tables
            .clicks
            .iter()
            .filter(|click| click.link_id == Some(link_id))
            .cloned()
            .collect();
        clicks.sort_by(|a, b| b.clicked_at.cmp(&a.clicked_at));
        Ok(clicks)
    }

    async fn ping(&self) -> Result<(), RedirectError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
