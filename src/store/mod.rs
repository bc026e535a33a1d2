//! Link storage backends
//!
//! The hosted backend owns the data; this module only describes the handful
//! of operations the redirect path needs and provides two implementations:
//! the PostgREST client used in production and an in-process store for tests
//! and local development.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RedirectError;
use crate::models::{Click, Link, NewClick};

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// Operations the redirect service needs from storage
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Looks up the active link with the given short code
    async fn find_active_link(&self, short_code: &str) -> Result<Option<Link>, RedirectError>;

    /// Inserts the click and increments the link's counter as one atomic
    /// operation. Returns the new counter value.
    async fn record_click(&self, click: NewClick) -> Result<i64, RedirectError>;

    /// All clicks for a link, newest first
    async fn clicks_for_link(&self, link_id: Uuid) -> Result<Vec<Click>, RedirectError>;

    /// Cheap reachability probe used by readiness checks
    async fn ping(&self) -> Result<(), RedirectError>;

    fn name(&self) -> &'static str;
}
