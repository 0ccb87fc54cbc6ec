//! Evidence-based confidence. Never looks at how good the place is.

use super::signals::SignalCounts;

const BASE: f64 = 35.0;
const SPECIFICITY_WEIGHT: f64 = 35.0;
const PER_NEWS_ITEM: f64 = 5.0;
const MAX_NEWS_POINTS: f64 = 20.0;
const PER_SIGNAL: f64 = 4.0;
const MAX_SIGNAL_POINTS: f64 = 12.0;

/// 具体性・ニュース件数・シグナル件数から 0..=100 の信頼度を算出する。
#[must_use]
pub fn confidence(specificity: f64, news_count: usize, signals: SignalCounts) -> u32 {
    let specificity_points = (SPECIFICITY_WEIGHT * specificity).clamp(0.0, SPECIFICITY_WEIGHT);
    let news_points = (PER_NEWS_ITEM * count_as_f64(news_count)).clamp(0.0, MAX_NEWS_POINTS);
    let signal_points =
        (PER_SIGNAL * f64::from(signals.total())).clamp(0.0, MAX_SIGNAL_POINTS);

    let raw = BASE + specificity_points + news_points + signal_points;
    to_percent(raw)
}

#[allow(clippy::cast_precision_loss)]
fn count_as_f64(count: usize) -> f64 {
    count as f64
}

/// Rounds and clamps a score into `0..=100`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_percent(raw: f64) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u32
}
