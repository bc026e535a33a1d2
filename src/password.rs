//! Password gate for protected links.
//!
//! Links created by older clients carry the password in clear text; newer
//! ones may store a bcrypt hash. Both are accepted.

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

pub fn is_bcrypt_hash(stored: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p))
}

/// Checks the visitor-supplied password against the stored value.
///
/// bcrypt verification runs on the blocking pool.
pub async fn password_matches(stored: &str, provided: Option<&str>) -> bool {
    let Some(provided) = provided else {
        return false;
    };

    if is_bcrypt_hash(stored) {
        let hash = stored.to_string();
        let candidate = provided.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash)).await;

        return match verified {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Stored password hash could not be verified");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        };
    }

    tracing::warn!("Link password is stored in plain text");
    stored == provided
}
