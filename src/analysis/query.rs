//! 入力の検証・正規化とキャッシュキーの導出。

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const QUERY_MIN_CHARS: usize = 3;
pub const QUERY_MAX_CHARS: usize = 500;
pub const CITY_MIN_CHARS: usize = 2;
pub const CITY_MAX_CHARS: usize = 80;

const REQUEST_ID_LEN: usize = 12;

/// `/v1/analyze` のリクエストボディ。
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    #[serde(default)]
    pub city: Option<String>,
}

impl AnalyzeRequest {
    #[must_use]
    pub fn new(query: impl Into<String>, city: Option<String>) -> Self {
        Self {
            query: query.into(),
            city,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query must have between {QUERY_MIN_CHARS} and {QUERY_MAX_CHARS} characters (got {0})")]
    QueryLength(usize),
    #[error("city must have between {CITY_MIN_CHARS} and {CITY_MAX_CHARS} characters (got {0})")]
    CityLength(usize),
}

/// 検証済みのクエリ。表示用にはトリムしただけの値を保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    city: String,
    text: String,
}

impl ValidatedQuery {
    /// 空白のみの city は `default_city` に置き換えてから検証する。
    ///
    /// # Errors
    /// query / city の文字数が範囲外の場合は [`ValidationError`] を返す。
    pub fn parse(request: &AnalyzeRequest, default_city: &str) -> Result<Self, ValidationError> {
        let text = request.query.trim();
        let text_len = text.chars().count();
        if !(QUERY_MIN_CHARS..=QUERY_MAX_CHARS).contains(&text_len) {
            return Err(ValidationError::QueryLength(text_len));
        }

        let city = request
            .city
            .as_deref()
            .map(str::trim)
            .filter(|city| !city.is_empty())
            .unwrap_or_else(|| default_city.trim());
        let city_len = city.chars().count();
        if !(CITY_MIN_CHARS..=CITY_MAX_CHARS).contains(&city_len) {
            return Err(ValidationError::CityLength(city_len));
        }

        Ok(Self {
            city: city.to_string(),
            text: text.to_string(),
        })
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn cache_key(&self) -> String {
        cache_key(&self.city, &self.text)
    }
}

/// 前後の空白を除いて小文字化する。内部の空白はそのまま残す。
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// 正規化した `"{city}|{query}"` の SHA-256（16 進 64 文字）。
#[must_use]
pub fn cache_key(city: &str, query: &str) -> String {
    let raw = format!("{}|{}", normalize(city), normalize(query));
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// レスポンスに載せる短い ID（キャッシュキーの先頭 12 文字）。
#[must_use]
pub fn request_id(cache_key: &str) -> String {
    cache_key.chars().take(REQUEST_ID_LEN).collect()
}
