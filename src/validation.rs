use validator::Validate;

use crate::error::RedirectError;

/// Path segment of a redirect request.
///
/// Slugs are free-form, so the only constraint is that one was given.
#[derive(Debug, Validate)]
pub struct ShortCode {
    #[validate(length(min = 1))]
    pub code: String,
}

/// Query string of a redirect request
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RedirectQuery {
    pub password: Option<String>,
}

impl RedirectQuery {
    /// Builds the query from decoded pairs. A repeated key keeps its first value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let password = pairs
            .into_iter()
            .find(|(key, _)| key == "password")
            .map(|(_, value)| value);

        Self { password }
    }
}

/// Request validation utilities
pub struct RequestValidator;

impl RequestValidator {
    /// Turns a decoded path segment into a short code. Only an empty segment
    /// is rejected; everything else goes to the store as-is.
    pub fn short_code(raw: &str) -> Result<String, RedirectError> {
        let short_code = ShortCode {
            code: raw.to_string(),
        };
        if short_code.validate().is_err() {
            return Err(RedirectError::MissingShortCode);
        }

        Ok(short_code.code)
    }

    /// Extracts the token from an `Authorization: Bearer <token>` header value
    pub fn bearer_token(header_value: Option<&str>) -> Option<&str> {
        header_value
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}
