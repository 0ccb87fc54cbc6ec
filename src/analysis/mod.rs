//! 分析リクエストの処理本体。
//!
//! 入力検証 → キャッシュ参照 → ニュース取得 → スコア算出 → LLM による
//! 報告文生成、の順に処理する。スコアは LLM 呼び出しより前に確定する。

pub mod query;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::SecondsFormat;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cache::{CacheOutcome, ResultCache};
use crate::clients::{LlmError, NewsSource, ReportGenerator};
use crate::config::{Config, MAX_NEWS_COUNT};
use crate::models::{AnalyzeInput, AnalyzeResponse};
use crate::observability::metrics::Metrics;
use crate::report::{Narrative, build_prompt};
use crate::scoring::ScoringEngine;

pub use query::{AnalyzeRequest, ValidatedQuery, ValidationError, cache_key, request_id};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Configuration(LlmError),
    #[error("Falha ao gerar relatório (IA): {0}")]
    Llm(LlmError),
}

impl From<LlmError> for AnalyzeError {
    fn from(error: LlmError) -> Self {
        if error.is_configuration() {
            Self::Configuration(error)
        } else {
            Self::Llm(error)
        }
    }
}

/// 分析処理の可変パラメータ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub default_city: String,
    pub cache_ttl: Duration,
}

impl AnalysisSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_city: config.default_city().to_string(),
            cache_ttl: config.cache_ttl(),
        }
    }
}

pub struct AnalysisService {
    engine: ScoringEngine,
    cache: ResultCache<AnalyzeResponse>,
    news: Arc<dyn NewsSource>,
    reports: Arc<dyn ReportGenerator>,
    settings: AnalysisSettings,
    metrics: Arc<Metrics>,
}

impl AnalysisService {
    #[must_use]
    pub fn new(
        engine: ScoringEngine,
        cache: ResultCache<AnalyzeResponse>,
        news: Arc<dyn NewsSource>,
        reports: Arc<dyn ReportGenerator>,
        settings: AnalysisSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            engine,
            cache,
            news,
            reports,
            settings,
            metrics,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    #[must_use]
    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.len().await
    }

    /// リクエストを検証し、キャッシュ済みでなければ分析を実行する。
    ///
    /// TTL 内の同一リクエスト（正規化後の city / query が一致）はキャッシュから
    /// 同じレスポンスを返す。失敗した分析はキャッシュしない。
    ///
    /// # Errors
    /// 入力が不正な場合、LLM の設定が無い場合、LLM 呼び出しが失敗した場合は
    /// [`AnalyzeError`] を返す。
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, AnalyzeError> {
        let query = ValidatedQuery::parse(request, &self.settings.default_city)?;
        let key = query.cache_key();
        let started = Instant::now();
        self.metrics.analyses_total.inc();

        let result = self
            .cache
            .get_or_compute(&key, self.settings.cache_ttl, || self.compute(&query, &key))
            .await;
        self.metrics
            .analysis_duration
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(lookup) => {
                self.metrics
                    .record_cache_outcome(lookup.outcome, lookup.evicted);
                info!(
                    request_id = %lookup.value.request_id,
                    cached = lookup.outcome != CacheOutcome::Miss,
                    outcome = ?lookup.outcome,
                    total = lookup.value.score.total,
                    "analysis completed"
                );
                Ok(lookup.into_value())
            }
            Err(error) => {
                self.metrics.analyses_failed.inc();
                warn!(request_id = %request_id(&key), error = %error, "analysis failed");
                Err(error)
            }
        }
    }

    #[instrument(skip_all, fields(request_id = %request_id(key), city = %query.city()))]
    async fn compute(
        &self,
        query: &ValidatedQuery,
        key: &str,
    ) -> Result<AnalyzeResponse, AnalyzeError> {
        // Fail fast before spending a news call
        self.reports.check_configured()?;

        let news_started = Instant::now();
        let mut news = self.news.fetch(query.city(), query.text()).await;
        news.truncate(MAX_NEWS_COUNT);
        self.metrics
            .news_fetch_duration
            .observe(news_started.elapsed().as_secs_f64());

        let score = self.engine.score(query.text(), &news);
        let prompt = build_prompt(query.city(), query.text(), &news, &score);

        let llm_started = Instant::now();
        let generated = self.reports.generate(&prompt).await;
        self.metrics
            .llm_duration
            .observe(llm_started.elapsed().as_secs_f64());
        let text = generated.inspect_err(|_| self.metrics.llm_failures.inc())?;

        let narrative = Narrative::from_llm_text(&text).unwrap_or_else(|| {
            self.metrics.llm_malformed_outputs.inc();
            warn!(
                output_chars = text.chars().count(),
                "LLM output was not a JSON object; using placeholder narrative"
            );
            Narrative::placeholder()
        });

        Ok(AnalyzeResponse {
            request_id: request_id(key),
            input: AnalyzeInput {
                query: query.text().to_string(),
                city: query.city().to_string(),
            },
            score,
            summary: narrative.summary,
            positives: narrative.positives,
            cautions: narrative.cautions,
            risks: narrative.risks,
            radar: narrative.radar,
            generated_at: self
                .cache
                .clock()
                .now()
                .to_rfc3339_opts(SecondsFormat::Micros, false),
        })
    }
}
