//! Short-code allocation
//!
//! Random codes are drawn from a Base62 alphabet and claimed by inserting
//! into the store, whose unique constraint on the code column is the only
//! concurrency control. A collision surfaces as a conflict and triggers a
//! fresh draw, up to a small attempt bound. Custom aliases get exactly one
//! attempt and report a conflict to the caller instead.

use std::iter;
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::cache::UrlCache;
use crate::error::{ServiceError, ServiceResult};
use crate::models::ShortUrl;
use crate::storage::{Storage, StorageError};

/// Draws for a random code before giving up
const MAX_GENERATION_ATTEMPTS: u32 = 5;

const CODE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const MIN_ALIAS_LEN: usize = 3;
const MAX_ALIAS_LEN: usize = 20;

/// Schemes rejected outright, before the http/https check
const DANGEROUS_SCHEMES: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// Generate a random Base62 code of the given length
pub fn generate_code(length: usize) -> String {
    iter::repeat_with(|| CODE_CHARS[rand::random_range(0..CODE_CHARS.len())] as char)
        .take(length)
        .collect()
}

/// Whether a code or alias has a shape the service could ever have issued:
/// 3 to 20 characters from [a-zA-Z0-9_-]
pub fn is_valid_short_code(code: &str) -> bool {
    (MIN_ALIAS_LEN..=MAX_ALIAS_LEN).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Validate a destination URL: http/https only, well formed, no script or
/// local-resource schemes
pub fn validate_target_url(raw: &str) -> ServiceResult<()> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ServiceError::Validation("URL cannot be empty".to_string()));
    }

    let lower = raw.to_lowercase();
    for scheme in DANGEROUS_SCHEMES {
        if lower.starts_with(scheme) {
            return Err(ServiceError::Validation(
                "this URL scheme is not allowed".to_string(),
            ));
        }
    }

    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(ServiceError::Validation(
            "URL must start with http:// or https://".to_string(),
        ));
    }

    Url::parse(raw).map_err(|e| ServiceError::Validation(format!("invalid URL: {}", e)))?;

    Ok(())
}

pub struct Shortener {
    storage: Arc<dyn Storage>,
    cache: Arc<dyn UrlCache>,
    code_length: usize,
}

impl Shortener {
    pub fn new(storage: Arc<dyn Storage>, cache: Arc<dyn UrlCache>, code_length: usize) -> Self {
        Self {
            storage,
            cache,
            code_length,
        }
    }

    /// Create a mapping for `original_url`, under `custom_alias` if given,
    /// otherwise under a freshly generated code
    pub async fn allocate(
        &self,
        original_url: &str,
        custom_alias: Option<&str>,
    ) -> ServiceResult<ShortUrl> {
        validate_target_url(original_url)?;
        let original_url = original_url.trim();

        let url = match custom_alias {
            Some(alias) => self.claim_alias(alias, original_url).await?,
            None => self.claim_generated(original_url).await?,
        };

        // Write-through so the first redirect is already a cache hit
        if let Err(err) = self.cache.set(&url.short_code, &url).await {
            warn!(short_code = %url.short_code, error = %err, "cache write failed after allocation");
        }

        Ok(url)
    }

    async fn claim_alias(&self, alias: &str, original_url: &str) -> ServiceResult<ShortUrl> {
        if !is_valid_short_code(alias) {
            return Err(ServiceError::Validation(format!(
                "alias must be {} to {} characters of letters, digits, '-' or '_'",
                MIN_ALIAS_LEN, MAX_ALIAS_LEN
            )));
        }

        match self.storage.create_url(alias, original_url, true).await {
            Ok(url) => Ok(url),
            Err(StorageError::Conflict) => Err(ServiceError::AliasConflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn claim_generated(&self, original_url: &str) -> ServiceResult<ShortUrl> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let code = generate_code(self.code_length);
            match self.storage.create_url(&code, original_url, false).await {
                Ok(url) => return Ok(url),
                Err(StorageError::Conflict) => {
                    debug!(attempt, "generated code collided, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ServiceError::AllocationExhausted)
    }
}
