//! 決定的なスコアリングエンジン。
//!
//! (query, news) から `ScoreResult` を算出する純粋関数群。外部 I/O や
//! 乱数には一切依存しないため、同じ入力は常に同じ結果になる。

pub mod confidence;
pub mod fusion;
pub mod place;
pub mod signals;
pub mod specificity;

use serde::{Deserialize, Serialize};

use crate::models::NewsItem;

pub use confidence::confidence;
pub use fusion::{DEFAULT_MULTIPLIER_FLOOR, Fusion, FusionParams, Verdict};
pub use place::{Category, ScoreBreakdown, score_place};
pub use signals::{Signal, SignalClassifier, SignalCounts, SignalRule, SignalRuleError};
pub use specificity::specificity;

/// スコアに付随する根拠情報。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMeta {
    pub multiplier: f64,
    pub specificity: f64,
    pub news_count: usize,
    pub signals: SignalCounts,
}

/// スコアリング結果。`AnalyzeResponse.score` にそのまま埋め込まれる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub place_score: u32,
    pub confidence: u32,
    pub total: u32,
    pub label: Verdict,
    pub breakdown: ScoreBreakdown,
    pub meta: ScoreMeta,
}

/// 分類器と合成パラメータを束ねたエンジン。
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    classifier: SignalClassifier,
    fusion: FusionParams,
}

impl ScoringEngine {
    #[must_use]
    pub fn new(classifier: SignalClassifier, fusion: FusionParams) -> Self {
        Self { classifier, fusion }
    }

    #[must_use]
    pub fn classifier(&self) -> &SignalClassifier {
        &self.classifier
    }

    #[must_use]
    pub fn fusion(&self) -> FusionParams {
        self.fusion
    }

    #[must_use]
    pub fn score(&self, query: &str, news: &[NewsItem]) -> ScoreResult {
        let specificity = specificity(query);
        let signals = self
            .classifier
            .tally(news.iter().map(|item| item.title.as_str()));
        let news_count = news.len();

        let breakdown = score_place(signals, news_count);
        let place_score = breakdown.total();
        let confidence = confidence(specificity, news_count, signals);
        let Fusion {
            multiplier,
            total,
            label,
        } = self.fusion.fuse(place_score, confidence);

        ScoreResult {
            place_score,
            confidence,
            total,
            label,
            breakdown,
            meta: ScoreMeta {
                multiplier: round_to(multiplier, 3),
                specificity: round_to(specificity, 2),
                news_count,
                signals,
            },
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
