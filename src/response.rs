use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};

/// Final result of a successful redirect request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Send the visitor to the stored destination
    Redirect { location: String },
    /// The link is protected and the visitor has not supplied the password
    PasswordRequired { short_code: String },
}

impl RedirectOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RedirectOutcome::Redirect { .. } => "redirected",
            RedirectOutcome::PasswordRequired { .. } => "password_required",
        }
    }

    pub fn render(self, site_name: &str) -> Response {
        match self {
            RedirectOutcome::Redirect { location } => redirect_response(&location),
            RedirectOutcome::PasswordRequired { short_code } => {
                Html(password_form(&short_code, site_name)).into_response()
            }
        }
    }
}

/// `302 Found` to the destination. Destinations that cannot be sent as a
/// header value are an internal error, not a redirect.
pub fn redirect_response(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => {
            tracing::error!(location = %location, "Stored destination is not a valid Location header");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

pub fn password_form(short_code: &str, site_name: &str) -> String {
    let code = escape_html(short_code);
    let site = escape_html(site_name);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Protected link - {site}</title>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body {{
      font-family: 'Inter', sans-serif;
      background: #0F0F23;
      color: #ffffff;
      display: flex;
      align-items: center;
      justify-content: center;
      min-height: 100vh;
      margin: 0;
    }}
    .container {{
      background: rgba(255, 255, 255, 0.1);
      border: 1px solid rgba(255, 255, 255, 0.2);
      border-radius: 16px;
      padding: 2rem;
      max-width: 400px;
      width: 100%;
      text-align: center;
    }}
    .logo {{
      color: #8B5CF6;
      font-size: 2rem;
      font-weight: bold;
      margin-bottom: 1rem;
    }}
    input {{
      width: 100%;
      padding: 12px;
      border: 1px solid rgba(255, 255, 255, 0.2);
      border-radius: 8px;
      background: rgba(255, 255, 255, 0.1);
      color: white;
      margin: 1rem 0;
      box-sizing: border-box;
    }}
    button {{
      width: 100%;
      padding: 12px;
      background: linear-gradient(135deg, #3B82F6, #8B5CF6);
      border: none;
      border-radius: 8px;
      color: white;
      font-weight: 600;
      cursor: pointer;
    }}
  </style>
</head>
<body>
  <div class="container">
    <div class="logo">{site}</div>
    <h2>Protected link</h2>
    <p>This link requires a password.</p>
    <form method="get" action="/{code}">
      <input type="password" name="password" placeholder="Enter the password" required autofocus>
      <button type="submit">Open link</button>
    </form>
  </div>
</body>
</html>
"#
    )
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_form_targets_short_code() {
        let html = password_form("abc123", "Abrev.io");
        assert!(html.contains(r#"action="/abc123""#));
        assert!(html.contains(r#"name="password""#));
        assert!(html.contains(r#"method="get""#));
        assert!(html.contains("Abrev.io"));
    }

    #[test]
    fn test_password_form_escapes_input() {
        let html = password_form("x", "<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_redirect_response() {
        let response = redirect_response("https://example.com/landing?utm=1");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://example.com/landing?utm=1"
        );
    }

    #[test]
    fn test_invalid_location_is_server_error() {
        let response = redirect_response("https://example.com/\nSet-Cookie: x=1");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_outcome_labels() {
        let redirect = RedirectOutcome::Redirect {
            location: "https://example.com".into(),
        };
        let gate = RedirectOutcome::PasswordRequired {
            short_code: "abc".into(),
        };
        assert_eq!(redirect.label(), "redirected");
        assert_eq!(gate.label(), "password_required");
    }
}
