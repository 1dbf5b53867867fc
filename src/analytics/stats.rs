//! Read-side aggregation of persisted analytics rows
//!
//! Stats are computed on demand from the store; nothing here caches
//! aggregate results. Country and browser rankings are bounded to a fixed
//! top-N with deterministic tie-breaking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::analytics::models::{BrowserCount, UrlStats, UserAgentCount};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::Storage;

/// Bound applied to topCountries and topBrowsers
const TOP_N: i64 = 10;

/// Coarse browser family derived from a raw user-agent string
///
/// Deterministic substring classification. Order matters: Edge and Opera
/// advertise "Chrome", and Chrome advertises "Safari", so the more specific
/// tokens are checked first.
pub fn classify_browser(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent else {
        return "Other";
    };

    if ua.contains("Edg/") || ua.contains("Edge/") {
        "Edge"
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("Firefox/") {
        "Firefox"
    } else if ua.contains("Chrome/") || ua.contains("Chromium/") {
        "Chrome"
    } else if ua.contains("Safari/") {
        "Safari"
    } else {
        "Other"
    }
}

/// Merge raw user-agent counts into ranked browser-family counts
fn rank_browsers(rows: Vec<UserAgentCount>) -> Vec<BrowserCount> {
    let mut families: HashMap<&'static str, i64> = HashMap::new();
    for row in &rows {
        *families
            .entry(classify_browser(row.user_agent.as_deref()))
            .or_insert(0) += row.count;
    }

    let mut ranked: Vec<BrowserCount> = families
        .into_iter()
        .map(|(browser, count)| BrowserCount {
            browser: browser.to_string(),
            count,
        })
        .collect();

    // Descending by count, name-ascending tie break, same as countries
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.browser.cmp(&b.browser)));
    ranked.truncate(TOP_N as usize);
    ranked
}

pub struct StatsAggregator {
    storage: Arc<dyn Storage>,
}

impl StatsAggregator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Compute per-URL statistics: total clicks, clicks by day, top
    /// countries, top browsers
    pub async fn get_stats(&self, short_code: &str) -> ServiceResult<UrlStats> {
        let url = self
            .storage
            .get_url(short_code)
            .await
            .map_err(|e| ServiceError::Dependency(e.to_string()))?
            .ok_or(ServiceError::NotFound)?;

        let total_clicks = self
            .storage
            .count_events(url.id)
            .await
            .map_err(|e| ServiceError::Dependency(e.to_string()))?;

        let clicks_by_day = self
            .storage
            .clicks_by_day(url.id)
            .await
            .map_err(|e| ServiceError::Dependency(e.to_string()))?;

        let top_countries = self
            .storage
            .country_counts(url.id, TOP_N)
            .await
            .map_err(|e| ServiceError::Dependency(e.to_string()))?;

        let user_agents = self
            .storage
            .user_agent_counts(url.id)
            .await
            .map_err(|e| ServiceError::Dependency(e.to_string()))?;

        Ok(UrlStats {
            short_code: url.short_code,
            original_url: url.original_url,
            total_clicks,
            clicks_by_day,
            top_countries,
            top_browsers: rank_browsers(user_agents),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const FIREFOX_UA: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const SAFARI_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                             AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    const EDGE_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                           (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

    #[test]
    fn test_classify_browser_families() {
        assert_eq!(classify_browser(Some(CHROME_UA)), "Chrome");
        assert_eq!(classify_browser(Some(FIREFOX_UA)), "Firefox");
        assert_eq!(classify_browser(Some(SAFARI_UA)), "Safari");
        assert_eq!(classify_browser(Some(EDGE_UA)), "Edge");
        assert_eq!(classify_browser(Some("curl/8.4.0")), "Other");
        assert_eq!(classify_browser(None), "Other");
    }

    #[test]
    fn test_classify_is_deterministic() {
        assert_eq!(
            classify_browser(Some(CHROME_UA)),
            classify_browser(Some(CHROME_UA))
        );
    }

    #[test]
    fn test_rank_browsers_merges_and_orders() {
        let rows = vec![
            UserAgentCount {
                user_agent: Some(CHROME_UA.to_string()),
                count: 2,
            },
            UserAgentCount {
                user_agent: Some(format!("{} variant", CHROME_UA)),
                count: 1,
            },
            UserAgentCount {
                user_agent: Some(FIREFOX_UA.to_string()),
                count: 3,
            },
            UserAgentCount {
                user_agent: None,
                count: 3,
            },
        ];

        let ranked = rank_browsers(rows);
        assert_eq!(ranked.len(), 3);
        // Firefox and Other tie at 3; name ascending puts Firefox first
        assert_eq!(ranked[0].browser, "Firefox");
        assert_eq!(ranked[1].browser, "Other");
        assert_eq!(ranked[2].browser, "Chrome");
        assert_eq!(ranked[2].count, 3);
    }
}
