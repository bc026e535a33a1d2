//! User-Agent classification for click records.
//!
//! Matching is plain substring search in a fixed order, so a Chromium-based
//! Edge UA (which also advertises `Chrome` and `Safari`) is counted as Chrome.

use serde::Serialize;

const MOBILE_MARKERS: [&str; 4] = ["Mobile", "Android", "iPhone", "iPad"];

const BROWSERS: [(&str, &str); 4] = [
    ("Chrome", "Chrome"),
    ("Firefox", "Firefox"),
    ("Safari", "Safari"),
    ("Edge", "Edge"),
];

const OPERATING_SYSTEMS: [(&str, &str); 5] = [
    ("Windows", "Windows"),
    ("Mac", "macOS"),
    ("Linux", "Linux"),
    ("Android", "Android"),
    ("iOS", "iOS"),
];

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device: &'static str,
    pub browser: &'static str,
    pub os: &'static str,
}

pub fn parse_user_agent(user_agent: &str) -> DeviceInfo {
    let device = if MOBILE_MARKERS.iter().any(|m| user_agent.contains(m)) {
        "Mobile"
    } else {
        "Desktop"
    };

    DeviceInfo {
        device,
        browser: first_match(user_agent, &BROWSERS),
        os: first_match(user_agent, &OPERATING_SYSTEMS),
    }
}

fn first_match(user_agent: &str, table: &[(&str, &'static str)]) -> &'static str {
    table
        .iter()
        .find(|(needle, _)| user_agent.contains(needle))
        .map(|(_, label)| *label)
        .unwrap_or(UNKNOWN)
}
