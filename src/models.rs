//! API とパイプラインで共有するデータ型。

use serde::{Deserialize, Serialize};

use crate::scoring::ScoreResult;

/// ニュースプロバイダから取得した記事。取得後は不変。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// レーダー項目の影響区分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadarImpact {
    Positive,
    Monitor,
    Risk,
}

/// LLM が生成する周辺レーダーの一項目。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadarItem {
    pub impact: RadarImpact,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    pub why_it_matters: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// 正規化前（トリムのみ）の入力。レスポンスにそのまま返す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeInput {
    pub query: String,
    pub city: String,
}

/// `/v1/analyze` のレスポンス。キャッシュにもこの形で保存する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub request_id: String,
    pub input: AnalyzeInput,
    pub score: ScoreResult,
    pub summary: String,
    pub positives: Vec<String>,
    pub cautions: Vec<String>,
    pub risks: Vec<String>,
    pub radar: Vec<RadarItem>,
    pub generated_at: String,
}
