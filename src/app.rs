use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    analysis::{AnalysisService, AnalysisSettings},
    api,
    cache::ResultCache,
    clients::{BingNewsClient, DisabledNews, NewsSource, OpenAiClient},
    config::Config,
    observability::Telemetry,
    scoring::{FusionParams, ScoringEngine, SignalClassifier},
    util::text::redact,
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    analysis: Arc<AnalysisService>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }

    pub(crate) fn analysis(&self) -> &AnalysisService {
        &self.registry.analysis
    }
}

impl ComponentRegistry {
    /// 構成情報と依存をまとめて初期化し、アプリケーションの共有レジストリを構築する。
    ///
    /// # Errors
    /// Telemetry の初期化、シグナル規則の読み込み、HTTP クライアント構築が
    /// 失敗した場合はエラーを返す。
    pub fn build(config: Config) -> Result<Self> {
        let telemetry = Telemetry::new(&config)?;
        Self::build_with_telemetry(config, telemetry)
    }

    /// トレーシング初期化済みの [`Telemetry`] を使って構築する。
    ///
    /// # Errors
    /// シグナル規則の読み込みや HTTP クライアント構築が失敗した場合はエラーを返す。
    pub fn build_with_telemetry(config: Config, telemetry: Telemetry) -> Result<Self> {
        let classifier = match config.signal_rules_path() {
            Some(path) => SignalClassifier::from_yaml_file(path)
                .with_context(|| format!("failed to load signal rules from {}", path.display()))?,
            None => SignalClassifier::portuguese().context("failed to build default signal rules")?,
        };
        let engine = ScoringEngine::new(classifier, FusionParams::new(config.multiplier_floor()));

        let news: Arc<dyn NewsSource> = match config.bing_news_key() {
            Some(key) => {
                info!(key = %redact(key), endpoint = config.bing_news_endpoint(), "news provider enabled");
                Arc::new(
                    BingNewsClient::new(
                        config.bing_news_endpoint(),
                        key,
                        config.news_market(),
                        config.news_count(),
                        config.news_timeout(),
                    )?
                    .with_metrics(telemetry.metrics_arc()),
                )
            }
            None => {
                warn!("BING_NEWS_KEY not set; analyses will run without news");
                Arc::new(DisabledNews)
            }
        };

        if config.openai_api_key().is_none() {
            warn!("OPENAI_API_KEY not set; analyze requests will fail with a configuration error");
        }
        let reports = Arc::new(OpenAiClient::new(
            config.openai_base_url(),
            config.openai_api_key().map(str::to_string),
            config.openai_model(),
            config.llm_temperature(),
            config.llm_timeout(),
        )?);

        let analysis = AnalysisService::new(
            engine,
            ResultCache::in_memory(),
            news,
            reports,
            AnalysisSettings::from_config(&config),
            telemetry.metrics_arc(),
        );

        Ok(Self::from_parts(config, telemetry, analysis))
    }

    /// 組み立て済みの部品からレジストリを作る。
    #[must_use]
    pub fn from_parts(config: Config, telemetry: Telemetry, analysis: AnalysisService) -> Self {
        Self {
            config: Arc::new(config),
            telemetry,
            analysis: Arc::new(analysis),
        }
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let cors = cors_layer(registry.config.cors_origins());
    let state = AppState::new(registry);
    api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(error) => {
                    warn!(origin, %error, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
