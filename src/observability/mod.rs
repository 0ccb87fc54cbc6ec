pub mod metrics;
pub mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;
use self::tracing::OtelSettings;
use crate::config::Config;

/// Telemetry（メトリクスとトレーシング）を管理する構造体。
#[derive(Debug, Clone)]
pub struct Telemetry {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// トレーシングを初期化し、専用レジストリにメトリクスを登録する。
    ///
    /// # Errors
    /// サブスクライバの初期化やメトリクス登録に失敗した場合はエラーを返す。
    pub fn new(config: &Config) -> Result<Self> {
        let otel = config.otel_exporter_endpoint().map(|endpoint| OtelSettings {
            endpoint: endpoint.to_string(),
            sampling_ratio: config.otel_sampling_ratio(),
        });
        tracing::init(otel.as_ref())?;
        Self::metrics_only()
    }

    /// トレーシングには触れずにメトリクスだけを用意する。
    ///
    /// # Errors
    /// メトリクス登録に失敗した場合はエラーを返す。
    pub fn metrics_only() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(Arc::clone(&registry))?);
        Ok(Self { registry, metrics })
    }

    /// メトリクスへのアクセスを提供する。
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn metrics_arc(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// 準備完了プローブを記録する。
    pub fn record_ready_probe(&self) {
        ::tracing::debug!("service ready probe");
    }

    /// ライブプローブを記録する。
    pub fn record_live_probe(&self) {
        ::tracing::debug!("service live probe");
    }

    /// Prometheusメトリクスをレンダリングする。
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
            ::tracing::warn!(error = %error, "failed to encode prometheus metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metrics() {
        let telemetry = Telemetry::metrics_only().expect("telemetry");
        telemetry.metrics().analyses_total.inc();

        let text = telemetry.render_prometheus();
        assert!(text.contains("decision_analyses_total 1"));
        assert!(text.contains("# TYPE decision_analysis_duration_seconds histogram"));
    }

    #[test]
    fn separate_instances_do_not_share_counters() {
        let a = Telemetry::metrics_only().expect("telemetry");
        let b = Telemetry::metrics_only().expect("telemetry");
        a.metrics().cache_hits.inc();
        assert!(b.metrics().cache_hits.get().abs() < f64::EPSILON);
    }
}
