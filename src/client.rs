//! Visitor details extracted from request headers.

use axum::http::{header, HeaderMap};
use std::net::IpAddr;

use crate::user_agent::{parse_user_agent, DeviceInfo};

/// Everything about the visitor that ends up in a click record, except geolocation.
#[derive(Debug, Clone)]
pub struct VisitorContext {
    pub ip: Option<IpAddr>,
    pub user_agent: String,
    pub referrer: Option<String>,
}

impl VisitorContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip: client_ip(headers).and_then(|ip| ip.parse().ok()),
            user_agent: header_str(headers, header::USER_AGENT.as_str())
                .unwrap_or_default()
                .to_string(),
            referrer: header_str(headers, header::REFERER.as_str())
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        }
    }

    pub fn device_info(&self) -> DeviceInfo {
        parse_user_agent(&self.user_agent)
    }
}

/// Raw client address as reported by the proxy in front of us.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first_ip) = forwarded.split(',').next() {
            let first_ip = first_ip.trim();
            if !first_ip.is_empty() {
                return Some(first_ip.to_string());
            }
        }
    }

    header_str(headers, "x-real-ip")
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_with_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("192.168.1.1, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.1"));

        assert_eq!(client_ip(&headers).as_deref(), Some("192.168.1.1"));
    }

    #[test]
    fn test_client_ip_with_real_ip_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.1"));

        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.1"));
    }

    #[test]
    fn test_client_ip_missing() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn test_unparseable_ip_is_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));

        let visitor = VisitorContext::from_headers(&headers);
        assert!(visitor.ip.is_none());
    }

    #[test]
    fn test_visitor_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("2001:db8::1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Firefox on Linux"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://news.example.com/"));

        let visitor = VisitorContext::from_headers(&headers);
        assert_eq!(visitor.ip, Some("2001:db8::1".parse().unwrap()));
        assert_eq!(visitor.referrer.as_deref(), Some("https://news.example.com/"));
        assert_eq!(visitor.device_info().browser, "Firefox");
    }

    #[test]
    fn test_empty_referer_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static(""));

        assert!(VisitorContext::from_headers(&headers).referrer.is_none());
    }
}
