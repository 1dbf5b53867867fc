//! Client IP extraction from HTTP headers
//!
//! Prefers the leftmost parseable X-Forwarded-For entry, falling back to the
//! socket remote address. The extracted address is only ever hashed or fed
//! to GeoIP; it is never persisted raw.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Extract the client IP address from request headers, falling back to the
/// socket remote address
pub fn extract_client_ip(headers: &HeaderMap, socket_addr: IpAddr) -> IpAddr {
    extract_from_x_forwarded_for(headers).unwrap_or(socket_addr)
}

fn extract_from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;

    xff.split(',')
        .map(str::trim)
        .find_map(|s| s.parse::<IpAddr>().ok())
}
