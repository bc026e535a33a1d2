use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("Short code is required")]
    MissingShortCode,

    #[error("Link not found")]
    NotFound,

    #[error("Link has expired")]
    Expired,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Geolocation error: {0}")]
    Geo(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RedirectError>;

impl RedirectError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RedirectError::MissingShortCode => StatusCode::BAD_REQUEST,
            RedirectError::NotFound => StatusCode::NOT_FOUND,
            RedirectError::Expired => StatusCode::GONE,
            RedirectError::Unauthorized => StatusCode::UNAUTHORIZED,
            RedirectError::Backend(_)
            | RedirectError::Geo(_)
            | RedirectError::Cache(_)
            | RedirectError::Config(_)
            | RedirectError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Outcome label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            RedirectError::MissingShortCode => "bad_request",
            RedirectError::NotFound => "not_found",
            RedirectError::Expired => "expired",
            RedirectError::Unauthorized => "unauthorized",
            _ => "error",
        }
    }

    /// Bare status line returned to the client. Server-side details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            RedirectError::Backend(_)
            | RedirectError::Geo(_)
            | RedirectError::Cache(_)
            | RedirectError::Config(_)
            | RedirectError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for RedirectError {
    fn from(err: reqwest::Error) -> Self {
        RedirectError::Backend(err.to_string())
    }
}

impl From<redis::RedisError> for RedirectError {
    fn from(err: redis::RedisError) -> Self {
        RedirectError::Cache(err.to_string())
    }
}

impl IntoResponse for RedirectError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, self.public_message()).into_response()
    }
}
