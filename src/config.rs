use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::scoring::DEFAULT_MULTIPLIER_FLOOR;

pub const DEFAULT_BING_NEWS_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/news/search";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/";
pub const MAX_NEWS_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    default_city: String,
    cors_origins: Vec<String>,
    openai_api_key: Option<String>,
    openai_model: String,
    openai_base_url: String,
    llm_timeout: Duration,
    llm_temperature: f64,
    bing_news_key: Option<String>,
    bing_news_endpoint: String,
    news_market: String,
    news_count: usize,
    news_timeout: Duration,
    cache_ttl: Duration,
    multiplier_floor: f64,
    signal_rules_path: Option<PathBuf>,
    otel_exporter_endpoint: Option<String>,
    otel_sampling_ratio: f64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から Decision Engine の設定値を読み込み、検証する。
    ///
    /// 必須の環境変数はない。資格情報が無い場合、ニュース取得は無効化され、
    /// LLM 呼び出しはリクエスト単位で設定エラーになる。
    ///
    /// # Errors
    /// 数値・アドレスのパースに失敗した場合や値が範囲外の場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_bind = parse_socket_addr("DECISION_ENGINE_HTTP_BIND", "0.0.0.0:8000")?;
        let default_city = parse_string("APP_CITY_DEFAULT", "São Paulo");
        let cors_origins = parse_csv("CORS_ORIGINS", "*");

        // LLM settings
        let openai_api_key = optional_var("OPENAI_API_KEY");
        let openai_model = parse_string("OPENAI_MODEL", "gpt-4o-mini");
        let openai_base_url = parse_string("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL);
        let llm_timeout = parse_duration_secs("LLM_TIMEOUT_SECS", 60)?;
        let llm_temperature = parse_f64("LLM_TEMPERATURE", 0.2)?;
        if !(0.0..=2.0).contains(&llm_temperature) {
            return Err(ConfigError::Invalid {
                name: "LLM_TEMPERATURE",
                source: anyhow::anyhow!("value must be between 0 and 2"),
            });
        }

        // News provider settings
        let bing_news_key = optional_var("BING_NEWS_KEY");
        let bing_news_endpoint = parse_string("BING_NEWS_ENDPOINT", DEFAULT_BING_NEWS_ENDPOINT);
        let news_market = parse_string("NEWS_MARKET", "pt-BR");
        let news_count = parse_usize("NEWS_COUNT", MAX_NEWS_COUNT)?;
        if !(1..=MAX_NEWS_COUNT).contains(&news_count) {
            return Err(ConfigError::Invalid {
                name: "NEWS_COUNT",
                source: anyhow::anyhow!("value must be between 1 and {MAX_NEWS_COUNT}"),
            });
        }
        let news_timeout = parse_duration_secs("NEWS_TIMEOUT_SECS", 12)?;

        // Cache / scoring
        let cache_ttl = parse_duration_secs("ANALYSIS_CACHE_TTL_SECONDS", 21_600)?;
        let multiplier_floor = parse_unit_interval("SCORE_MULTIPLIER_FLOOR", DEFAULT_MULTIPLIER_FLOOR)?;
        let signal_rules_path = optional_var("SIGNAL_RULES_PATH").map(PathBuf::from);

        // OpenTelemetry settings
        let otel_exporter_endpoint = optional_var("OTEL_EXPORTER_OTLP_ENDPOINT");
        let otel_sampling_ratio = parse_unit_interval("OTEL_SAMPLING_RATIO", 1.0)?;

        Ok(Self {
            http_bind,
            default_city,
            cors_origins,
            openai_api_key,
            openai_model,
            openai_base_url,
            llm_timeout,
            llm_temperature,
            bing_news_key,
            bing_news_endpoint,
            news_market,
            news_count,
            news_timeout,
            cache_ttl,
            multiplier_floor,
            signal_rules_path,
            otel_exporter_endpoint,
            otel_sampling_ratio,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn default_city(&self) -> &str {
        &self.default_city
    }

    /// `*` を含む場合は全オリジンを許可する。
    #[must_use]
    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    #[must_use]
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref()
    }

    #[must_use]
    pub fn openai_model(&self) -> &str {
        &self.openai_model
    }

    #[must_use]
    pub fn openai_base_url(&self) -> &str {
        &self.openai_base_url
    }

    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    #[must_use]
    pub fn llm_temperature(&self) -> f64 {
        self.llm_temperature
    }

    #[must_use]
    pub fn bing_news_key(&self) -> Option<&str> {
        self.bing_news_key.as_deref()
    }

    #[must_use]
    pub fn bing_news_endpoint(&self) -> &str {
        &self.bing_news_endpoint
    }

    #[must_use]
    pub fn news_market(&self) -> &str {
        &self.news_market
    }

    #[must_use]
    pub fn news_count(&self) -> usize {
        self.news_count
    }

    #[must_use]
    pub fn news_timeout(&self) -> Duration {
        self.news_timeout
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[must_use]
    pub fn multiplier_floor(&self) -> f64 {
        self.multiplier_floor
    }

    #[must_use]
    pub fn signal_rules_path(&self) -> Option<&std::path::Path> {
        self.signal_rules_path.as_deref()
    }

    #[must_use]
    pub fn otel_exporter_endpoint(&self) -> Option<&str> {
        self.otel_exporter_endpoint.as_deref()
    }

    #[must_use]
    pub fn otel_sampling_ratio(&self) -> f64 {
        self.otel_sampling_ratio
    }
}

/// 空文字列は未設定として扱う。
fn optional_var(name: &'static str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_string(name: &'static str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = parse_string(name, default);

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_secs)?;
    Ok(Duration::from_secs(value))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = parse_string(name, &default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = parse_string(name, &default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = parse_string(name, &default.to_string());
    let value = raw.parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    if !value.is_finite() {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be finite"),
        });
    }
    Ok(value)
}

fn parse_unit_interval(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = parse_f64(name, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be between 0 and 1"),
        });
    }
    Ok(value)
}

fn parse_csv(name: &'static str, default: &str) -> Vec<String> {
    let raw = parse_string(name, default);
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
