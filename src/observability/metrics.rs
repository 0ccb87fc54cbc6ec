/// Prometheusメトリクス定義。
use prometheus::{
    Counter, Histogram, Registry, register_counter_with_registry,
    register_histogram_with_registry,
};
use std::sync::Arc;

use crate::cache::CacheOutcome;

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub analyses_total: Counter,
    pub analyses_failed: Counter,
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub cache_coalesced: Counter,
    pub cache_evictions: Counter,
    pub news_fetch_failures: Counter,
    pub news_items_fetched: Counter,
    pub llm_failures: Counter,
    pub llm_malformed_outputs: Counter,

    // ヒストグラム
    pub analysis_duration: Histogram,
    pub news_fetch_duration: Histogram,
    pub llm_duration: Histogram,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成し、`registry` に登録する。
    ///
    /// # Errors
    /// 同名のメトリクスが既に登録済みの場合など、登録に失敗した場合はエラーを返す。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            analyses_total: register_counter_with_registry!(
                "decision_analyses_total",
                "Total number of analyze requests that passed validation",
                registry
            )?,
            analyses_failed: register_counter_with_registry!(
                "decision_analyses_failed_total",
                "Total number of analyze requests that failed after validation",
                registry
            )?,
            cache_hits: register_counter_with_registry!(
                "decision_cache_hits_total",
                "Analyses served from the result cache",
                registry
            )?,
            cache_misses: register_counter_with_registry!(
                "decision_cache_misses_total",
                "Analyses computed because no fresh cache entry existed",
                registry
            )?,
            cache_coalesced: register_counter_with_registry!(
                "decision_cache_coalesced_total",
                "Requests that waited for a concurrent computation of the same key",
                registry
            )?,
            cache_evictions: register_counter_with_registry!(
                "decision_cache_evictions_total",
                "Expired cache entries evicted on lookup",
                registry
            )?,
            news_fetch_failures: register_counter_with_registry!(
                "decision_news_fetch_failures_total",
                "News provider calls that failed and degraded to an empty list",
                registry
            )?,
            news_items_fetched: register_counter_with_registry!(
                "decision_news_items_fetched_total",
                "News items returned by the provider",
                registry
            )?,
            llm_failures: register_counter_with_registry!(
                "decision_llm_failures_total",
                "LLM calls that failed",
                registry
            )?,
            llm_malformed_outputs: register_counter_with_registry!(
                "decision_llm_malformed_outputs_total",
                "LLM responses that could not be parsed into a narrative",
                registry
            )?,
            analysis_duration: register_histogram_with_registry!(
                "decision_analysis_duration_seconds",
                "End-to-end duration of analyze requests",
                registry
            )?,
            news_fetch_duration: register_histogram_with_registry!(
                "decision_news_fetch_duration_seconds",
                "Duration of news provider calls",
                registry
            )?,
            llm_duration: register_histogram_with_registry!(
                "decision_llm_duration_seconds",
                "Duration of LLM calls",
                registry
            )?,
        })
    }

    /// キャッシュ参照結果を対応するカウンターに振り分ける。
    pub fn record_cache_outcome(&self, outcome: CacheOutcome, evicted: bool) {
        match outcome {
            CacheOutcome::Hit => self.cache_hits.inc(),
            CacheOutcome::Coalesced => self.cache_coalesced.inc(),
            CacheOutcome::Miss => self.cache_misses.inc(),
        }
        if evicted {
            self.cache_evictions.inc();
        }
    }
}
