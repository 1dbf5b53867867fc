//! Cache-aside short URL resolution

use std::sync::Arc;

use tracing::warn;

use crate::cache::UrlCache;
use crate::error::{ServiceError, ServiceResult};
use crate::models::ShortUrl;
use crate::storage::Storage;

pub struct Resolver {
    storage: Arc<dyn Storage>,
    cache: Arc<dyn UrlCache>,
}

impl Resolver {
    pub fn new(storage: Arc<dyn Storage>, cache: Arc<dyn UrlCache>) -> Self {
        Self { storage, cache }
    }

    /// Resolve a short code to its stored URL.
    ///
    /// Cache errors degrade to a miss and store errors to `Dependency`;
    /// only a confirmed absence maps to `NotFound`.
    pub async fn resolve(&self, short_code: &str) -> ServiceResult<ShortUrl> {
        match self.cache.get(short_code).await {
            Ok(Some(url)) => return Ok(url),
            Ok(None) => {}
            Err(err) => {
                warn!(short_code, error = %err, "cache lookup failed, falling back to store");
            }
        }

        let url = self
            .storage
            .get_url(short_code)
            .await
            .map_err(|e| ServiceError::Dependency(e.to_string()))?
            .ok_or(ServiceError::NotFound)?;

        if let Err(err) = self.cache.set(short_code, &url).await {
            warn!(short_code, error = %err, "cache repopulation failed");
        }

        Ok(url)
    }
}
