/// スコアリングの公開 API に対するシナリオテスト。
use decision_engine::models::NewsItem;
use decision_engine::scoring::{
    Category, FusionParams, ScoringEngine, Signal, SignalClassifier, Verdict,
};
use proptest::prelude::*;

fn engine() -> ScoringEngine {
    ScoringEngine::new(
        SignalClassifier::portuguese().expect("default rules"),
        FusionParams::default(),
    )
}

fn news(titles: &[&str]) -> Vec<NewsItem> {
    titles
        .iter()
        .map(|title| NewsItem {
            title: (*title).to_string(),
            url: String::new(),
            published_at: None,
            source: None,
        })
        .collect()
}

#[test]
fn specific_address_without_news() {
    let result = engine().score("Rua Augusta, 123", &[]);

    assert!(result.meta.specificity >= 0.5);
    // Radar do Entorno: base 14 reduced by 4 for the empty news list
    assert_eq!(result.breakdown.get(Category::Surroundings), 10);
    assert_eq!(result.place_score, 65);
    assert_eq!(result.confidence, 56);
    assert_eq!(result.total, 54);
    assert_eq!(result.label, Verdict::Neutral);
}

#[test]
fn robbery_headline_is_negative() {
    let baseline = engine().score("Pinheiros", &news(&["Feira de artesanato"]));
    let result = engine().score("Pinheiros", &news(&["Assalto na região"]));

    assert_eq!(result.meta.signals.negative, 1);
    assert_eq!(
        baseline.breakdown.get(Category::Safety) - result.breakdown.get(Category::Safety),
        6
    );
}

#[test]
fn new_park_headline_is_positive() {
    let baseline = engine().score("Pinheiros", &news(&["Feira de artesanato"]));
    let result = engine().score("Pinheiros", &news(&["Inauguração de novo parque"]));

    assert_eq!(result.meta.signals.positive, 1);
    assert_eq!(
        result.breakdown.get(Category::Infrastructure)
            - baseline.breakdown.get(Category::Infrastructure),
        2
    );
}

#[test]
fn negative_wins_over_positive_in_one_title() {
    let classifier = SignalClassifier::portuguese().expect("default rules");
    assert_eq!(
        classifier.classify("Assalto durante inauguração do parque"),
        Some(Signal::Negative)
    );

    let result = engine().score("Pinheiros", &news(&["Assalto durante inauguração do parque"]));
    assert_eq!(result.meta.signals.negative, 1);
    assert_eq!(result.meta.signals.positive, 0);
}

#[test]
fn lower_floor_dampens_more() {
    let strict = ScoringEngine::new(
        SignalClassifier::portuguese().expect("default rules"),
        FusionParams::new(0.3),
    );
    let default = engine().score("Moema", &[]);
    let dampened = strict.score("Moema", &[]);

    assert_eq!(default.place_score, dampened.place_score);
    assert!(dampened.total < default.total);
}

const TITLES: [&str; 6] = [
    "Assalto na região",
    "Inauguração de novo parque",
    "Alerta de dengue",
    "Feira de artesanato",
    "Obra do metrô avança",
    "Enchente atinge bairro",
];

fn news_strategy() -> impl Strategy<Value = Vec<NewsItem>> {
    prop::collection::vec(prop::sample::select(TITLES.to_vec()), 0..=10)
        .prop_map(|titles| news(&titles))
}

proptest! {
    #[test]
    fn breakdown_stays_within_ceilings(query in "[A-Za-z0-9 ,.-]{3,40}", items in news_strategy()) {
        let result = engine().score(&query, &items);

        for category in Category::ALL {
            prop_assert!(result.breakdown.get(category) <= category.ceiling());
        }
        prop_assert_eq!(result.breakdown.total(), result.place_score);
        prop_assert!(result.place_score <= 100);
        prop_assert!(result.confidence <= 100);
        prop_assert!(result.total <= 100);
    }

    #[test]
    fn scoring_is_deterministic(query in "[A-Za-z0-9 ,.-]{3,40}", items in news_strategy()) {
        prop_assert_eq!(engine().score(&query, &items), engine().score(&query, &items));
    }

    #[test]
    fn extra_negative_news_never_raises_place_score(items in news_strategy()) {
        let before = engine().score("Pinheiros", &items);
        let mut more = items.clone();
        more.extend(news(&["Assalto na região"]));
        let after = engine().score("Pinheiros", &more);
        prop_assert!(after.place_score <= before.place_score);
    }
}
