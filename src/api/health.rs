use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct HealthReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Heartbeat {
    ok: bool,
    time: String,
}

/// 旧来のヘルスチェック。フロントエンドが `ok` と現在時刻を見る。
pub(crate) async fn heartbeat() -> Json<Heartbeat> {
    Json(Heartbeat {
        ok: true,
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
    })
}

/// 外部プロバイダは劣化するだけなので、準備完了は設定だけで決まる。
pub(crate) async fn ready(State(state): State<AppState>) -> Json<HealthReport> {
    state.telemetry().record_ready_probe();
    let detail = state
        .config()
        .openai_api_key()
        .is_none()
        .then(|| "OPENAI_API_KEY not configured; /v1/analyze will fail".to_string());
    Json(HealthReport {
        status: "ready",
        detail,
    })
}

pub(crate) async fn live(State(state): State<AppState>) -> Json<HealthReport> {
    state.telemetry().record_live_probe();
    Json(HealthReport {
        status: "live",
        detail: None,
    })
}
