//! Click aggregation for a single link.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::models::Click;

const TOP_N: usize = 10;
const DAILY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyClicks {
    pub date: NaiveDate,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyClicks {
    pub hour: u32,
    pub clicks: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkStats {
    pub short_code: String,
    pub stored_clicks: i64,
    pub total_clicks: u64,
    pub unique_clicks: u64,
    pub clicks_today: u64,
    pub clicks_this_week: u64,
    pub clicks_this_month: u64,
    pub top_countries: Vec<Bucket>,
    pub top_browsers: Vec<Bucket>,
    pub top_devices: Vec<Bucket>,
    pub top_referrers: Vec<Bucket>,
    pub daily_clicks: Vec<DailyClicks>,
    pub hourly_clicks: Vec<HourlyClicks>,
}

/// Aggregates clicks relative to `now`. Day boundaries are UTC midnight.
pub fn compute_stats(
    short_code: &str,
    stored_clicks: i64,
    clicks: &[Click],
    now: DateTime<Utc>,
) -> LinkStats {
    let today = now.date_naive();
    let start_of_today = today.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let week_start = start_of_today - Duration::days(7);
    let month_start = start_of_today - Duration::days(DAILY_WINDOW_DAYS);

    let count_since = |since: DateTime<Utc>| clicks.iter().filter(|c| c.clicked_at >= since).count() as u64;

    let unique_ips: HashSet<&str> = clicks
        .iter()
        .filter_map(|c| c.ip_address.as_deref())
        .filter(|ip| !ip.is_empty())
        .collect();

    let mut per_day: HashMap<NaiveDate, u64> = HashMap::new();
    let mut per_hour = [0u64; 24];
    for click in clicks {
        *per_day.entry(click.clicked_at.date_naive()).or_default() += 1;
        if click.clicked_at >= start_of_today {
            per_hour[click.clicked_at.hour() as usize] += 1;
        }
    }

    let daily_clicks = (0..DAILY_WINDOW_DAYS)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            DailyClicks {
                date,
                clicks: per_day.get(&date).copied().unwrap_or(0),
            }
        })
        .collect();

    let hourly_clicks = per_hour
        .iter()
        .enumerate()
        .map(|(hour, &clicks)| HourlyClicks {
            hour: hour as u32,
            clicks,
        })
        .collect();

    LinkStats {
        short_code: short_code.to_string(),
        stored_clicks,
        total_clicks: clicks.len() as u64,
        unique_clicks: unique_ips.len() as u64,
        clicks_today: count_since(start_of_today),
        clicks_this_week: count_since(week_start),
        clicks_this_month: count_since(month_start),
        top_countries: top_buckets(clicks.iter().map(|c| c.country.as_deref()), "Unknown"),
        top_browsers: top_buckets(clicks.iter().map(|c| c.browser.as_deref()), "Unknown"),
        top_devices: top_buckets(clicks.iter().map(|c| c.device.as_deref()), "Unknown"),
        top_referrers: top_buckets(clicks.iter().map(|c| c.referrer.as_deref()), "Direct"),
        daily_clicks,
        hourly_clicks,
    }
}

/// Counts values, most frequent first; ties are ordered by label.
fn top_buckets<'a>(values: impl Iterator<Item = Option<&'a str>>, missing: &str) -> Vec<Bucket> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for value in values {
        let label = value.filter(|v| !v.is_empty()).unwrap_or(missing);
        *counts.entry(label).or_default() += 1;
    }

    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(label, clicks)| Bucket {
            label: label.to_string(),
            clicks,
        })
        .collect();
    buckets.sort_by(|a, b| b.clicks.cmp(&a.clicks).then_with(|| a.label.cmp(&b.label)));
    buckets.truncate(TOP_N);
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn click(at: DateTime<Utc>, ip: Option<&str>, country: Option<&str>, referrer: Option<&str>) -> Click {
        Click {
            id: Uuid::new_v4(),
            link_id: None,
            clicked_at: at,
            ip_address: ip.map(str::to_string),
            country: country.map(str::to_string),
            city: None,
            device: Some("Desktop".to_string()),
            browser: Some("Chrome".to_string()),
            os: Some("Windows".to_string()),
            referrer: referrer.map(str::to_string),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_empty_clicks() {
        let stats = compute_stats("abc", 0, &[], now());
        assert_eq!(stats.total_clicks, 0);
        assert_eq!(stats.unique_clicks, 0);
        assert!(stats.top_countries.is_empty());
        assert_eq!(stats.daily_clicks.len(), 30);
        assert_eq!(stats.hourly_clicks.len(), 24);
    }

    #[test]
    fn test_time_windows() {
        let now = now();
        let clicks = vec![
            click(now - Duration::hours(1), Some("1.1.1.1"), None, None),
            click(now - Duration::days(3), Some("1.1.1.1"), None, None),
            click(now - Duration::days(20), Some("2.2.2.2"), None, None),
            click(now - Duration::days(45), None, None, None),
        ];

        let stats = compute_stats("abc", 4, &clicks, now);
        assert_eq!(stats.total_clicks, 4);
        assert_eq!(stats.unique_clicks, 2);
        assert_eq!(stats.clicks_today, 1);
        assert_eq!(stats.clicks_this_week, 2);
        assert_eq!(stats.clicks_this_month, 3);
        assert_eq!(stats.stored_clicks, 4);
    }

    #[test]
    fn test_daily_and_hourly_series() {
        let now = now();
        let clicks = vec![
            click(now - Duration::minutes(5), None, None, None),
            click(now - Duration::minutes(10), None, None, None),
            click(now - Duration::days(1), None, None, None),
        ];

        let stats = compute_stats("abc", 3, &clicks, now);
        let last = stats.daily_clicks.last().unwrap();
        assert_eq!(last.date, now.date_naive());
        assert_eq!(last.clicks, 2);
        assert_eq!(stats.daily_clicks[28].clicks, 1);
        assert_eq!(stats.daily_clicks.first().unwrap().date, now.date_naive() - Duration::days(29));

        assert_eq!(stats.hourly_clicks[14].clicks, 2);
        assert_eq!(stats.hourly_clicks.iter().map(|h| h.clicks).sum::<u64>(), 2);
    }

    #[test]
    fn test_top_buckets_and_fallback_labels() {
        let now = now();
        let clicks = vec![
            click(now, None, Some("Brazil"), Some("https://t.co/")),
            click(now, None, Some("Brazil"), None),
            click(now, None, Some("Portugal"), Some("")),
            click(now, None, None, None),
        ];

        let stats = compute_stats("abc", 4, &clicks, now);
        assert_eq!(
            stats.top_countries[0],
            Bucket {
                label: "Brazil".to_string(),
                clicks: 2
            }
        );
        assert_eq!(stats.top_countries[1].label, "Portugal");
        assert_eq!(stats.top_countries[2].label, "Unknown");
        assert_eq!(stats.top_referrers[0].label, "Direct");
        assert_eq!(stats.top_referrers[0].clicks, 3);
    }

    #[test]
    fn test_top_buckets_truncate() {
        let now = now();
        let countries: Vec<String> = (0..15).map(|i| format!("Country {:02}", i)).collect();
        let clicks: Vec<Click> = countries
            .iter()
            .map(|c| click(now, None, Some(c), None))
            .collect();

        let stats = compute_stats("abc", 15, &clicks, now);
        assert_eq!(stats.top_countries.len(), 10);
        assert_eq!(stats.top_countries[0].label, "Country 00");
    }
}
