//! Background click processor
//!
//! Consumes `ClickJob`s delivered by the queue: resolves the owning URL,
//! hashes the visitor IP, resolves the country code, and persists one
//! analytics row. Delivery is at-least-once; a job redelivered after a
//! crash mid-processing produces a duplicate row, which is accepted.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::analytics::models::{ClickJob, NewClickEvent};
use crate::analytics::GeoIpService;
use crate::storage::Storage;

/// Stored digest length in hex characters
const HASHED_IP_LEN: usize = 64;

/// One-way salted digest of a visitor IP
///
/// SHA-256 over `ip || salt`, lowercase hex, truncated to a fixed length.
/// The raw IP is not recoverable from the output.
pub fn hash_ip(ip: &str, salt: &str) -> String {
    let digest = Sha256::digest(format!("{}{}", ip, salt).as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(HASHED_IP_LEN);
    hex
}

pub struct ClickProcessor {
    storage: Arc<dyn Storage>,
    geoip: GeoIpService,
    ip_hash_salt: String,
}

impl ClickProcessor {
    pub fn new(storage: Arc<dyn Storage>, geoip: GeoIpService, ip_hash_salt: String) -> Self {
        Self {
            storage,
            geoip,
            ip_hash_salt,
        }
    }

    /// Process a single click job
    ///
    /// `Ok(())` means the job is done, including the drop case for codes
    /// that no longer resolve (retrying cannot make a deleted URL
    /// reappear). `Err` means the row could not be persisted and the queue
    /// should redeliver.
    pub async fn process(&self, job: &ClickJob) -> anyhow::Result<()> {
        let url = match self.storage.get_url(&job.short_code).await? {
            Some(url) => url,
            None => {
                warn!(short_code = %job.short_code, "dropping click for unknown short code");
                return Ok(());
            }
        };

        let hashed_ip = job
            .ip
            .as_deref()
            .map(|ip| hash_ip(ip, &self.ip_hash_salt));

        // Best-effort: lookup failures and unknown addresses resolve to None
        let country_code = job.ip.as_deref().and_then(|ip| self.geoip.lookup(ip));

        self.storage
            .insert_event(NewClickEvent {
                url_id: url.id,
                access_time: job.timestamp,
                hashed_ip,
                user_agent: job.user_agent.clone(),
                referer: job.referer.clone(),
                country_code: country_code.clone(),
            })
            .await?;

        debug!(
            short_code = %job.short_code,
            country = country_code.as_deref().unwrap_or("-"),
            "analytics event recorded"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ip_deterministic() {
        let a = hash_ip("203.0.113.5", "s");
        let b = hash_ip("203.0.113.5", "s");
        assert_eq!(a, b);
        assert_ne!(a, "203.0.113.5");
        assert_eq!(a.len(), HASHED_IP_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_ip_salt_changes_digest() {
        assert_ne!(hash_ip("203.0.113.5", "s"), hash_ip("203.0.113.5", "t"));
    }

    #[test]
    fn test_hash_ip_distinct_ips_distinct_digests() {
        assert_ne!(hash_ip("203.0.113.5", "s"), hash_ip("203.0.113.6", "s"));
    }
}
