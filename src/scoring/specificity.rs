//! 住所クエリの具体性推定。
//!
//! 具体性は confidence の算出にのみ使い、place_score には影響させない。

use std::sync::LazyLock;

use regex::Regex;

const DIGIT_WEIGHT: f64 = 0.35;
const SEPARATOR_WEIGHT: f64 = 0.15;
const POSTAL_CODE_WEIGHT: f64 = 0.25;
const URL_WEIGHT: f64 = 0.25;
const ADDRESS_NOUN_WEIGHT: f64 = 0.10;

/// 住所種別を表す名詞（部分一致）。
pub const ADDRESS_NOUNS: &[&str] = &[
    "bairro", "rua", "avenida", "av.", "travessa", "alameda", "praça",
];

// CEP: 01310-100 もしくは区切りなしの 8 桁。
static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{5}-[0-9]{3}|[0-9]{8}").expect("postal code pattern compiles")
});

/// クエリ文字列がどれだけ具体的な住所を指しているかを 0.0..=1.0 で返す。
///
/// 各条件は独立に加算され、最後にまとめて clamp される。
#[must_use]
pub fn specificity(query: &str) -> f64 {
    let text = query.trim().to_lowercase();
    let mut score = 0.0;

    if text.chars().any(|c| c.is_ascii_digit()) {
        score += DIGIT_WEIGHT;
    }
    if text.contains(',') || text.contains('-') {
        score += SEPARATOR_WEIGHT;
    }
    if POSTAL_CODE.is_match(&text) {
        score += POSTAL_CODE_WEIGHT;
    }
    if text.contains("http://") || text.contains("https://") {
        score += URL_WEIGHT;
    }
    if ADDRESS_NOUNS.iter().any(|noun| text.contains(noun)) {
        score += ADDRESS_NOUN_WEIGHT;
    }

    f64::clamp(score, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[rstest]
    #[case("Pinheiros", 0.0)]
    #[case("Rua Augusta, 123", 0.60)]
    #[case("Avenida Paulista 1000", 0.45)]
    #[case("CEP 01310-100", 0.75)]
    #[case("01310100", 0.60)]
    #[case("bairro Moema", 0.10)]
    #[case("Vila-Madalena", 0.15)]
    fn specificity_adds_independent_signals(#[case] query: &str, #[case] expected: f64) {
        approx(specificity(query), expected);
    }

    #[test]
    fn specificity_is_case_insensitive_and_trimmed() {
        approx(specificity("   RUA AUGUSTA   "), specificity("rua augusta"));
        approx(specificity("  PRAÇA da Sé "), ADDRESS_NOUN_WEIGHT);
    }

    #[test]
    fn specificity_clamps_to_one_when_everything_matches() {
        let query = "https://maps.example.com/rua-augusta, 01310-100";
        // 0.35 + 0.15 + 0.25 + 0.25 + 0.10 = 1.10 before clamping
        approx(specificity(query), 1.0);
    }

    #[test]
    fn abbreviated_avenue_counts_as_address_noun() {
        approx(specificity("av. paulista"), ADDRESS_NOUN_WEIGHT);
    }
}
