//! Place score: five fixed categories, each clamped to its own ceiling.
//!
//! Ceilings sum to 100, so the place score needs no final clamp.

use serde::{Deserialize, Serialize};

use super::signals::SignalCounts;

const BASE_POINTS: i64 = 14;
const MAX_NEWS_BONUS: i64 = 4;

/// スコア内訳のカテゴリ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Price,
    Safety,
    Infrastructure,
    Surroundings,
    Stability,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Price,
        Self::Safety,
        Self::Infrastructure,
        Self::Surroundings,
        Self::Stability,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Price => "Preço vs Mercado",
            Self::Safety => "Segurança & Risco",
            Self::Infrastructure => "Infraestrutura & Mobilidade",
            Self::Surroundings => "Radar do Entorno",
            Self::Stability => "Estabilidade da Região",
        }
    }

    #[must_use]
    pub const fn ceiling(self) -> u32 {
        match self {
            Self::Price | Self::Safety => 25,
            Self::Infrastructure => 20,
            Self::Surroundings | Self::Stability => 15,
        }
    }
}

/// カテゴリ別の得点。シリアライズ時のキーはユーザー向けのカテゴリ名。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(rename = "Preço vs Mercado")]
    pub price: u32,
    #[serde(rename = "Segurança & Risco")]
    pub safety: u32,
    #[serde(rename = "Infraestrutura & Mobilidade")]
    pub infrastructure: u32,
    #[serde(rename = "Radar do Entorno")]
    pub surroundings: u32,
    #[serde(rename = "Estabilidade da Região")]
    pub stability: u32,
}

impl ScoreBreakdown {
    #[must_use]
    pub const fn get(&self, category: Category) -> u32 {
        match category {
            Category::Price => self.price,
            Category::Safety => self.safety,
            Category::Infrastructure => self.infrastructure,
            Category::Surroundings => self.surroundings,
            Category::Stability => self.stability,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::ALL
            .into_iter()
            .map(move |category| (category, self.get(category)))
    }

    /// 合計点（= `place_score`）。
    #[must_use]
    pub fn total(&self) -> u32 {
        self.iter().map(|(_, points)| points).sum()
    }
}

/// Working values before the per-category clamp; may go negative.
#[derive(Debug, Clone, Copy)]
struct RawPoints {
    price: i64,
    safety: i64,
    infrastructure: i64,
    surroundings: i64,
    stability: i64,
}

impl RawPoints {
    const fn base() -> Self {
        Self {
            price: BASE_POINTS,
            safety: BASE_POINTS,
            infrastructure: BASE_POINTS,
            surroundings: BASE_POINTS,
            stability: BASE_POINTS,
        }
    }

    fn clamp_into_breakdown(self) -> ScoreBreakdown {
        ScoreBreakdown {
            price: clamp_to(self.price, Category::Price),
            safety: clamp_to(self.safety, Category::Safety),
            infrastructure: clamp_to(self.infrastructure, Category::Infrastructure),
            surroundings: clamp_to(self.surroundings, Category::Surroundings),
            stability: clamp_to(self.stability, Category::Stability),
        }
    }
}

fn clamp_to(points: i64, category: Category) -> u32 {
    let clamped = points.clamp(0, i64::from(category.ceiling()));
    u32::try_from(clamped).unwrap_or(0)
}

/// シグナル件数とニュース件数から内訳を算出する。具体性には依存しない。
#[must_use]
pub fn score_place(signals: SignalCounts, news_count: usize) -> ScoreBreakdown {
    let positive = i64::from(signals.positive);
    let monitor = i64::from(signals.monitor);
    let negative = i64::from(signals.negative);
    let mut points = RawPoints::base();

    if news_count == 0 {
        // no evidence at all
        points.surroundings -= 4;
        points.stability -= 1;
    } else {
        let volume = i64::try_from(news_count).unwrap_or(MAX_NEWS_BONUS);
        points.surroundings += volume.clamp(1, MAX_NEWS_BONUS);
    }

    points.safety -= negative
        .saturating_mul(6)
        .saturating_add(monitor.saturating_mul(2))
        .clamp(0, 18);
    points.stability -= negative
        .saturating_mul(4)
        .saturating_add(monitor.saturating_mul(2))
        .clamp(0, 14);
    points.infrastructure += positive.saturating_mul(2).clamp(0, 6);
    points.surroundings += positive.clamp(0, 3);

    points.clamp_into_breakdown()
}
