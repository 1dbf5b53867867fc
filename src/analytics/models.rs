//! Data models for the click-analytics pipeline

use serde::{Deserialize, Serialize};

/// Click event captured on the redirect path and carried through the job
/// queue. Everything except the code and timestamp may be absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClickJob {
    pub short_code: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub referer: Option<String>,
    /// Click timestamp (Unix seconds), supplied by the enqueuing side
    pub timestamp: i64,
}

/// Analytics row as written by the processor. The id is assigned by the
/// store; rows are insert-only and never updated.
#[derive(Debug, Clone)]
pub struct NewClickEvent {
    pub url_id: i64,
    pub access_time: i64,
    pub hashed_ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub country_code: Option<String>,
}

/// Per-day click count
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq, Eq)]
pub struct DayCount {
    pub date: String,
    pub count: i64,
}

/// Per-country click count
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq, Eq)]
pub struct CountryCount {
    pub country: String,
    pub count: i64,
}

/// Raw per-user-agent count, grouped in SQL before browser classification
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAgentCount {
    pub user_agent: Option<String>,
    pub count: i64,
}

/// Per-browser-family click count
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BrowserCount {
    pub browser: String,
    pub count: i64,
}

/// Aggregated statistics for one short URL
#[derive(Debug, Clone, Serialize)]
pub struct UrlStats {
    pub short_code: String,
    pub original_url: String,
    pub total_clicks: i64,
    pub clicks_by_day: Vec<DayCount>,
    pub top_countries: Vec<CountryCount>,
    pub top_browsers: Vec<BrowserCount>,
}
