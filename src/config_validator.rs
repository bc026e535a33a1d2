use crate::config::Config;
use crate::error::RedirectError;

/// Validates configuration objects for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the backend base URL
    pub fn validate_backend_url(url: &str) -> Result<(), RedirectError> {
        if url.is_empty() {
            return Err(RedirectError::Config(
                "SUPABASE_URL cannot be empty".to_string(),
            ));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(RedirectError::Config(
                "SUPABASE_URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates a Redis URL
    pub fn validate_redis_url(url: &str) -> Result<(), RedirectError> {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(RedirectError::Config(
                "REDIS_URL must start with 'redis://' or 'rediss://'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates the whole configuration. The backend settings are only
    /// required when the service talks to the hosted backend.
    pub fn validate(config: &Config, needs_backend: bool) -> Result<(), RedirectError> {
        if needs_backend {
            Self::validate_backend_url(&config.supabase_url)?;

            if config.supabase_service_role_key.trim().is_empty() {
                return Err(RedirectError::Config(
                    "SUPABASE_SERVICE_ROLE_KEY cannot be empty".to_string(),
                ));
            }
        }

        if config.redis_enabled() {
            Self::validate_redis_url(&config.redis_url)?;
        }

        if config.geo_enabled
            && !config.geo_api_url.starts_with("http://")
            && !config.geo_api_url.starts_with("https://")
        {
            return Err(RedirectError::Config(
                "GEO_API_URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        if config.geo_timeout_ms == 0 || config.backend_timeout_ms == 0 {
            return Err(RedirectError::Config(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
