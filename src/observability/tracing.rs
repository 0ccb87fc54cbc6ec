use std::sync::{Mutex, OnceLock, PoisonError};

use anyhow::{Context, Error, Result};
use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracer, SdkTracerProvider},
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "decision-engine";

static TRACING_INIT: Mutex<bool> = Mutex::new(false);
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// OTLP エクスポートの設定。
#[derive(Debug, Clone, PartialEq)]
pub struct OtelSettings {
    pub endpoint: String,
    pub sampling_ratio: f64,
}

/// Tracing サブスクライバを一度だけ初期化する。
///
/// `otel` が指定されている場合は OTLP エクスポーターを追加する。
/// エクスポーターの構築に失敗した場合は fmt レイヤーのみで起動する。
///
/// # Errors
/// サブスクライバの初期化に失敗した場合はエラーを返す。
pub fn init(otel: Option<&OtelSettings>) -> Result<()> {
    let mut initialized = TRACING_INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if *initialized {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).json();

    let (tracer, export_error) = match otel.map(init_tracer) {
        Some(Ok(tracer)) => (Some(tracer), None),
        Some(Err(error)) => (None, Some(error)),
        None => (None, None),
    };
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));
    let otel_enabled = otel_layer.is_some();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| Error::msg(e.to_string()))?;

    match (otel, export_error) {
        (Some(settings), None) => info!(
            otel_enabled,
            endpoint = %settings.endpoint,
            sampling_ratio = settings.sampling_ratio,
            "tracing initialized with OTLP export"
        ),
        (_, Some(error)) => warn!(
            otel_enabled,
            error = %error,
            "OTLP exporter unavailable; tracing to stdout only"
        ),
        (None, None) => info!(otel_enabled, "tracing initialized"),
    }

    *initialized = true;
    Ok(())
}

/// OTLP (gRPC) にスパンを送るトレーサーを作り、プロバイダーを保持する。
fn init_tracer(settings: &OtelSettings) -> Result<SdkTracer> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(settings.endpoint.as_str())
        .build()
        .context("failed to build OTLP span exporter")?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", SERVICE_NAME),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            settings.sampling_ratio,
        ))))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(SERVICE_NAME);
    // Only the first successful init is kept; init() is itself guarded
    let _ = TRACER_PROVIDER.set(provider);

    Ok(tracer)
}

/// 未送信のスパンをフラッシュしてエクスポーターを停止する。OTel 無効時は何もしない。
pub fn shutdown() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(error) = provider.shutdown()
    {
        warn!(error = %error, "failed to shut down tracer provider");
    }
}
