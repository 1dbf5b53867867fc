//! GeoIP lookup service using MaxMind GeoLite2/GeoIP2 MMDB
//!
//! Thread-safe, memory-mapped country resolution. Lookups are best-effort:
//! any parse or database failure yields `None` and never an error.

use anyhow::{Context, Result};
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;

/// Country-code resolver backed by an optional MaxMind database
pub struct GeoIpService {
    reader: Option<Arc<Reader<Mmap>>>,
}

impl GeoIpService {
    /// Create a new GeoIP service from an optional MMDB file path
    ///
    /// With no path configured every lookup resolves to `None`, which keeps
    /// the analytics pipeline functional without a database on disk.
    pub fn new(db_path: Option<&str>) -> Result<Self> {
        let reader = if let Some(path) = db_path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        Ok(Self { reader })
    }

    /// Resolve an IP string to an ISO 3166-1 alpha-2 country code
    pub fn lookup(&self, ip: &str) -> Option<String> {
        let reader = self.reader.as_ref()?;
        let ip: IpAddr = ip.parse().ok()?;

        let result = reader.lookup(ip).ok()?;
        // The City database is a superset of Country data, so decoding as
        // Country works against either file.
        let country = result.decode::<geoip2::Country>().ok()??;
        country.country.iso_code.map(|s| s.to_string())
    }
}

impl Clone for GeoIpService {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
        }
    }
}
