use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShortUrl {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub is_custom_alias: bool,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub url: String,
    pub custom_alias: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub short_url: String,
    pub short_code: String,
    pub original_url: String,
    pub created_at: i64,
}

impl UrlResponse {
    pub fn from_url(url: &ShortUrl, public_base_url: &str) -> Self {
        Self {
            short_url: format!(
                "{}/{}",
                public_base_url.trim_end_matches('/'),
                url.short_code
            ),
            short_code: url.short_code.clone(),
            original_url: url.original_url.clone(),
            created_at: url.created_at,
        }
    }
}
