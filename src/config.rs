use envconfig::Envconfig;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Base URL of the hosted backend (REST API lives under /rest/v1)
    #[envconfig(from = "SUPABASE_URL", default = "")]
    pub supabase_url: String,

    /// Service-role key sent as both `apikey` and bearer token
    #[envconfig(from = "SUPABASE_SERVICE_ROLE_KEY", default = "")]
    pub supabase_service_role_key: String,

    /// Timeout for backend REST calls in milliseconds
    #[envconfig(from = "BACKEND_TIMEOUT_MS", default = "5000")]
    pub backend_timeout_ms: u64,

    /// Redis connection URL for the geolocation cache; empty keeps the cache in-process
    #[envconfig(from = "REDIS_URL", default = "")]
    pub redis_url: String,

    /// Look up country and city for each click
    #[envconfig(from = "GEO_ENABLED", default = "true")]
    pub geo_enabled: bool,

    /// ipapi.co-compatible geolocation endpoint
    #[envconfig(from = "GEO_API_URL", default = "https://ipapi.co")]
    pub geo_api_url: String,

    #[envconfig(from = "GEO_TIMEOUT_MS", default = "1500")]
    pub geo_timeout_ms: u64,

    #[envconfig(from = "GEO_CACHE_TTL_SECS", default = "86400")]
    pub geo_cache_ttl_secs: u64,

    /// Record the click before the password gate is resolved
    #[envconfig(from = "RECORD_CLICKS_BEFORE_PASSWORD", default = "true")]
    pub record_clicks_before_password: bool,

    /// Bearer token for the stats endpoint; unset disables it
    #[envconfig(from = "STATS_API_TOKEN")]
    pub stats_api_token: Option<String>,

    /// Brand shown on the password page
    #[envconfig(from = "SITE_NAME", default = "Abrev.io")]
    pub site_name: String,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_millis(self.geo_timeout_ms)
    }

    pub fn geo_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.geo_cache_ttl_secs)
    }

    pub fn stats_token(&self) -> Option<&str> {
        self.stats_api_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn redis_enabled(&self) -> bool {
        !self.redis_url.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            supabase_url: String::new(),
            supabase_service_role_key: String::new(),
            backend_timeout_ms: 5000,
            redis_url: String::new(),
            geo_enabled: true,
            geo_api_url: "https://ipapi.co".to_string(),
            geo_timeout_ms: 1500,
            geo_cache_ttl_secs: 86400,
            record_clicks_before_password: true,
            stats_api_token: None,
            site_name: "Abrev.io".to_string(),
            log_level: "info".to_string(),
        }
    }
}
