//! place_score と confidence を合成して最終スコアとラベルを決める。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::confidence::to_percent;

/// 低信頼度のときに place_score をどこまで減衰させるかの下限（既定 0.60）。
pub const DEFAULT_MULTIPLIER_FLOOR: f64 = 0.60;

/// 最終判定ラベル。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Boa decisão")]
    GoodDecision,
    #[serde(rename = "Boa decisão, com atenção")]
    GoodWithCaution,
    #[serde(rename = "Neutro (precisa de mais dados)")]
    Neutral,
    #[serde(rename = "Não recomendado")]
    NotRecommended,
}

impl Verdict {
    /// total の閾値で判定する（上から順に評価）。
    #[must_use]
    pub const fn from_total(total: u32) -> Self {
        if total >= 80 {
            Self::GoodDecision
        } else if total >= 65 {
            Self::GoodWithCaution
        } else if total >= 50 {
            Self::Neutral
        } else {
            Self::NotRecommended
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GoodDecision => "Boa decisão",
            Self::GoodWithCaution => "Boa decisão, com atenção",
            Self::Neutral => "Neutro (precisa de mais dados)",
            Self::NotRecommended => "Não recomendado",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 合成パラメータ。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    multiplier_floor: f64,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            multiplier_floor: DEFAULT_MULTIPLIER_FLOOR,
        }
    }
}

/// 合成結果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fusion {
    pub multiplier: f64,
    pub total: u32,
    pub label: Verdict,
}

impl FusionParams {
    /// 下限値は 0.0..=1.0 に丸め込まれる。
    #[must_use]
    pub fn new(multiplier_floor: f64) -> Self {
        let multiplier_floor = if multiplier_floor.is_nan() {
            DEFAULT_MULTIPLIER_FLOOR
        } else {
            multiplier_floor.clamp(0.0, 1.0)
        };
        Self { multiplier_floor }
    }

    #[must_use]
    pub fn multiplier_floor(&self) -> f64 {
        self.multiplier_floor
    }

    /// `floor + (1 - floor) * confidence / 100`。confidence=100 で 1.0 になる。
    #[must_use]
    pub fn multiplier(&self, confidence: u32) -> f64 {
        let ratio = f64::from(confidence.min(100)) / 100.0;
        self.multiplier_floor + (1.0 - self.multiplier_floor) * ratio
    }

    #[must_use]
    pub fn fuse(&self, place_score: u32, confidence: u32) -> Fusion {
        let multiplier = self.multiplier(confidence);
        let total = to_percent(f64::from(place_score) * multiplier);
        Fusion {
            multiplier,
            total,
            label: Verdict::from_total(total),
        }
    }
}
