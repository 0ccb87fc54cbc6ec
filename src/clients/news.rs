//! ニュースプロバイダ（Bing News Search）クライアント。
//!
//! 取得に失敗してもエラーは返さず、空リストに劣化させる。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::NewsItem;
use crate::observability::metrics::Metrics;
use crate::util::text::truncate_error_message;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// 地域ニュースの取得元。
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// `"{query} {city}"` に関する最新記事を返す。失敗時は空。
    async fn fetch(&self, city: &str, query: &str) -> Vec<NewsItem>;
}

/// 資格情報が無いときに使う取得元。常に空を返す。
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNews;

#[async_trait]
impl NewsSource for DisabledNews {
    async fn fetch(&self, _city: &str, _query: &str) -> Vec<NewsItem> {
        debug!("news provider disabled; skipping fetch");
        Vec::new()
    }
}

#[derive(Debug, Clone)]
pub struct BingNewsClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    market: String,
    count: usize,
    metrics: Option<Arc<Metrics>>,
}

impl BingNewsClient {
    /// # Errors
    /// HTTP クライアントの構築やエンドポイント URL の解析に失敗した場合はエラーを返す。
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        market: impl Into<String>,
        count: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build news client")?;
        let endpoint = Url::parse(endpoint).context("invalid news endpoint URL")?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            market: market.into(),
            count,
            metrics: None,
        })
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn try_fetch(&self, city: &str, query: &str) -> Result<Vec<NewsItem>> {
        let search = format!("{query} {city}");
        let count = self.count.to_string();

        let response = self
            .client
            .get(self.endpoint.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .query(&[
                ("q", search.as_str()),
                ("mkt", self.market.as_str()),
                ("count", count.as_str()),
                ("sortBy", "Date"),
            ])
            .send()
            .await
            .context("news search request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "news search returned error status {status}: {}",
                truncate_error_message(&body)
            ));
        }

        let body: BingNewsResponse = response
            .json()
            .await
            .context("failed to deserialize news search response")?;

        Ok(body
            .value
            .into_iter()
            .filter_map(BingArticle::into_news_item)
            .take(self.count)
            .collect())
    }
}

#[async_trait]
impl NewsSource for BingNewsClient {
    async fn fetch(&self, city: &str, query: &str) -> Vec<NewsItem> {
        match self.try_fetch(city, query).await {
            Ok(items) => {
                debug!(city, count = items.len(), "fetched news items");
                if let Some(metrics) = &self.metrics {
                    metrics
                        .news_items_fetched
                        .inc_by(f64::from(u32::try_from(items.len()).unwrap_or(u32::MAX)));
                }
                items
            }
            Err(error) => {
                warn!(city, error = ?error, "news fetch failed; continuing without news");
                if let Some(metrics) = &self.metrics {
                    metrics.news_fetch_failures.inc();
                }
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct BingNewsResponse {
    #[serde(default)]
    value: Vec<BingArticle>,
}

#[derive(Debug, Deserialize)]
struct BingArticle {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "datePublished")]
    date_published: Option<String>,
    #[serde(default)]
    provider: Vec<BingProvider>,
}

#[derive(Debug, Deserialize)]
struct BingProvider {
    #[serde(default)]
    name: Option<String>,
}

impl BingArticle {
    /// タイトルの無い記事は分類できないので捨てる。
    fn into_news_item(self) -> Option<NewsItem> {
        let title = non_empty(self.name)?;
        Some(NewsItem {
            title,
            url: non_empty(self.url).unwrap_or_default(),
            published_at: non_empty(self.date_published),
            source: self
                .provider
                .into_iter()
                .next()
                .and_then(|provider| non_empty(provider.name)),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, count: usize) -> BingNewsClient {
        BingNewsClient::new(
            &format!("{}/v7.0/news/search", server.uri()),
            "bing-key",
            "pt-BR",
            count,
            Duration::from_secs(2),
        )
        .expect("client should build")
    }

    fn article(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "url": "https://g1.globo.com/sp/noticia",
            "datePublished": "2025-02-10T12:00:00.0000000Z",
            "provider": [{"name": "G1"}, {"name": "ignored"}]
        })
    }

    #[tokio::test]
    async fn fetch_maps_articles_and_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v7.0/news/search"))
            .and(header(SUBSCRIPTION_KEY_HEADER, "bing-key"))
            .and(query_param("q", "Rua Augusta São Paulo"))
            .and(query_param("mkt", "pt-BR"))
            .and(query_param("count", "5"))
            .and(query_param("sortBy", "Date"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [article(" Assalto na região "), {"name": "Sem fonte", "provider": []}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = client_for(&server, 5)
            .fetch("São Paulo", "Rua Augusta")
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Assalto na região");
        assert_eq!(items[0].source.as_deref(), Some("G1"));
        assert_eq!(
            items[0].published_at.as_deref(),
            Some("2025-02-10T12:00:00.0000000Z")
        );
        assert_eq!(items[1].url, "");
        assert!(items[1].source.is_none());
    }

    #[tokio::test]
    async fn fetch_keeps_at_most_count_items_and_drops_untitled() {
        let server = MockServer::start().await;
        let mut value: Vec<_> = (0..8).map(|i| article(&format!("Notícia {i}"))).collect();
        value.insert(0, json!({"url": "https://example.com/no-title"}));
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": value })))
            .mount(&server)
            .await;

        let items = client_for(&server, 3).fetch("São Paulo", "Moema").await;

        let titles: Vec<_> = items.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, ["Notícia 0", "Notícia 1", "Notícia 2"]);
    }

    #[tokio::test]
    async fn successful_fetch_counts_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [article("Obra do metrô"), article("Feira no bairro")]
            })))
            .mount(&server)
            .await;

        let metrics = Arc::new(Metrics::new(Arc::new(Registry::new())).expect("metrics"));
        let client = client_for(&server, 5).with_metrics(Arc::clone(&metrics));

        assert_eq!(client.fetch("São Paulo", "Moema").await.len(), 2);
        assert!((metrics.news_items_fetched.get() - 2.0).abs() < f64::EPSILON);
        assert!(metrics.news_fetch_failures.get().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn error_status_degrades_to_empty_and_counts_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let metrics = Arc::new(Metrics::new(Arc::new(Registry::new())).expect("metrics"));
        let client = client_for(&server, 5).with_metrics(Arc::clone(&metrics));

        assert!(client.fetch("São Paulo", "Moema").await.is_empty());
        assert!((metrics.news_fetch_failures.get() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn malformed_body_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        assert!(client_for(&server, 5).fetch("São Paulo", "Moema").await.is_empty());
    }

    #[tokio::test]
    async fn slow_provider_times_out_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": [article("tarde demais")]}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = BingNewsClient::new(
            &format!("{}/v7.0/news/search", server.uri()),
            "bing-key",
            "pt-BR",
            5,
            Duration::from_millis(50),
        )
        .expect("client should build");

        assert!(client.fetch("São Paulo", "Moema").await.is_empty());
    }

    #[tokio::test]
    async fn disabled_source_returns_nothing() {
        assert!(DisabledNews.fetch("São Paulo", "Moema").await.is_empty());
    }
}
