/// 実クライアント（wiremock 上の Bing / OpenAI）を通した分析フローの統合テスト。
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use decision_engine::analysis::{AnalysisService, AnalysisSettings, AnalyzeError, AnalyzeRequest};
use decision_engine::cache::{ManualClock, MemoryStore, ResultCache};
use decision_engine::clients::{BingNewsClient, OpenAiClient};
use decision_engine::models::RadarImpact;
use decision_engine::observability::metrics::Metrics;
use decision_engine::scoring::{FusionParams, ScoringEngine, SignalClassifier};
use prometheus::Registry;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TTL: Duration = Duration::from_secs(6 * 60 * 60);

struct Stack {
    service: Arc<AnalysisService>,
    clock: Arc<ManualClock>,
    news_server: MockServer,
    llm_server: MockServer,
}

async fn stack(api_key: Option<&str>) -> Stack {
    let news_server = MockServer::start().await;
    let llm_server = MockServer::start().await;
    let clock = Arc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2025-03-01T09:30:00Z")
            .expect("timestamp")
            .with_timezone(&Utc),
    ));
    let metrics = Arc::new(Metrics::new(Arc::new(Registry::new())).expect("metrics"));

    let news = BingNewsClient::new(
        &format!("{}/v7.0/news/search", news_server.uri()),
        "bing-key",
        "pt-BR",
        5,
        Duration::from_secs(2),
    )
    .expect("news client")
    .with_metrics(Arc::clone(&metrics));
    let llm = OpenAiClient::new(
        &llm_server.uri(),
        api_key.map(str::to_string),
        "gpt-4o-mini",
        0.2,
        Duration::from_secs(2),
    )
    .expect("llm client");

    let service = AnalysisService::new(
        ScoringEngine::new(
            SignalClassifier::portuguese().expect("rules"),
            FusionParams::default(),
        ),
        ResultCache::new(Arc::new(MemoryStore::new()), clock.clone()),
        Arc::new(news),
        Arc::new(llm),
        AnalysisSettings {
            default_city: "São Paulo".into(),
            cache_ttl: TTL,
        },
        metrics,
    );

    Stack {
        service: Arc::new(service),
        clock,
        news_server,
        llm_server,
    }
}

fn llm_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "output": [{
            "type": "message",
            "content": [{"type": "output_text", "text": text}]
        }]
    }))
}

const NARRATIVE: &str = r#"Segue o relatório:
{
  "summary": "Bairro com boa mobilidade, mas atenção à segurança.",
  "positives": ["Metrô próximo", "Comércio ativo", "Parques"],
  "cautions": ["Assaltos recentes", "Trânsito"],
  "risks": ["Alagamentos pontuais"],
  "radar": [
    {"impact": "risk", "title": "Assalto na região", "date": "2025-02-27", "why_it_matters": "Indica risco à segurança.", "source": "G1"},
    {"impact": "positive", "title": "Novo parque", "why_it_matters": "Mais lazer."}
  ]
}"#;

#[tokio::test]
async fn full_flow_scores_news_and_caches_response() {
    let stack = stack(Some("sk-test")).await;
    Mock::given(method("GET"))
        .and(path("/v7.0/news/search"))
        .and(query_param("q", "Rua Augusta, 123 São Paulo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"name": "Assalto na região da Augusta", "url": "https://g1.globo.com/1",
                 "datePublished": "2025-02-27T10:00:00Z", "provider": [{"name": "G1"}]},
                {"name": "Inauguração de novo parque", "url": "https://g1.globo.com/2",
                 "provider": [{"name": "G1"}]}
            ]
        })))
        .expect(1)
        .mount(&stack.news_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(llm_reply(NARRATIVE))
        .expect(1)
        .mount(&stack.llm_server)
        .await;

    let request = AnalyzeRequest::new("Rua Augusta, 123", Some("São Paulo".into()));
    let first = stack.service.analyze(&request).await.expect("first analysis");

    assert_eq!(first.score.meta.news_count, 2);
    assert_eq!(first.score.meta.signals.negative, 1);
    assert_eq!(first.score.meta.signals.positive, 1);
    assert_eq!(first.cautions, ["Assaltos recentes", "Trânsito"]);
    assert_eq!(first.radar.len(), 2);
    assert_eq!(first.radar[0].impact, RadarImpact::Risk);
    assert_eq!(first.radar[1].source, None);

    stack.clock.advance(Duration::from_secs(60 * 60));
    let again = AnalyzeRequest::new(" rua augusta, 123\n", Some(" SÃO PAULO ".into()));
    let second = stack.service.analyze(&again).await.expect("cached analysis");

    assert_eq!(
        serde_json::to_vec(&first).expect("json"),
        serde_json::to_vec(&second).expect("json")
    );
    // wiremock verifies the .expect(1) counts when the servers drop
}

#[tokio::test]
async fn missing_key_fails_without_calling_providers() {
    let stack = stack(None).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(0)
        .mount(&stack.news_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(llm_reply("{}"))
        .expect(0)
        .mount(&stack.llm_server)
        .await;

    let error = stack
        .service
        .analyze(&AnalyzeRequest::new("Moema", None))
        .await
        .expect_err("must fail");

    assert!(matches!(error, AnalyzeError::Configuration(_)));
}

#[tokio::test]
async fn news_outage_still_produces_a_report() {
    let stack = stack(Some("sk-test")).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&stack.news_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(llm_reply(r#"{"summary": "Sem notícias.", "radar": []}"#))
        .mount(&stack.llm_server)
        .await;

    let response = stack
        .service
        .analyze(&AnalyzeRequest::new("Rua Augusta, 123", None))
        .await
        .expect("analysis succeeds");

    assert_eq!(response.score.meta.news_count, 0);
    assert_eq!(response.score.place_score, 65);
    assert_eq!(response.summary, "Sem notícias.");
}

#[tokio::test]
async fn llm_outage_is_not_cached() {
    let stack = stack(Some("sk-test")).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&stack.news_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(1)
        .mount(&stack.llm_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(llm_reply(r#"{"summary": "Recuperado."}"#))
        .mount(&stack.llm_server)
        .await;

    let request = AnalyzeRequest::new("Moema", None);
    let error = stack.service.analyze(&request).await.expect_err("first call fails");
    assert!(matches!(error, AnalyzeError::Llm(_)));

    let response = stack.service.analyze(&request).await.expect("retry succeeds");
    assert_eq!(response.summary, "Recuperado.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_requests_share_one_upstream_call() {
    let stack = stack(Some("sk-test")).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(1)
        .mount(&stack.news_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(llm_reply(NARRATIVE).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&stack.llm_server)
        .await;

    let tasks = (0..6).map(|_| {
        let service = Arc::clone(&stack.service);
        tokio::spawn(async move {
            service
                .analyze(&AnalyzeRequest::new("Vila Madalena", None))
                .await
                .expect("analysis succeeds")
        })
    });
    let responses: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task"))
        .collect();

    assert!(responses.windows(2).all(|pair| pair[0] == pair[1]));
}
