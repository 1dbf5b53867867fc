//! Click-analytics pipeline
//!
//! Clicks are captured on the redirect path as `ClickJob`s, carried through
//! the job queue, and processed in the background: IP hashing (one-way,
//! salted), best-effort GeoIP country resolution, and an insert-only
//! analytics row per click. Statistics are aggregated on read from the
//! persisted rows.

pub mod geoip;
pub mod ip_extractor;
pub mod models;
pub mod processor;
pub mod stats;

pub use geoip::GeoIpService;
pub use ip_extractor::extract_client_ip;
pub use models::{ClickJob, NewClickEvent, UrlStats};
pub use processor::{hash_ip, ClickProcessor};
pub use stats::StatsAggregator;
