//! LLM（OpenAI Responses API）クライアント。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::util::text::truncate_error_message;

#[derive(Debug, Error)]
pub enum LlmError {
    /// API キーが無い。ネットワーク I/O の前に検出する。
    #[error("OPENAI_API_KEY não configurada no backend.")]
    MissingApiKey,
    #[error("LLM request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("LLM endpoint returned error status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode LLM response: {0}")]
    Decode(String),
}

impl LlmError {
    /// 呼び出し側の設定不備によるエラーか。
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingApiKey)
    }
}

/// プロンプトから自由文を生成する外部サービス。
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// 生成を呼ぶ前に設定を検証する。ニュース取得より先に呼ばれる。
    ///
    /// # Errors
    /// 資格情報などが欠けている場合は [`LlmError`] を返す。
    fn check_configured(&self) -> Result<(), LlmError> {
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    model: String,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    temperature: f64,
}

impl OpenAiClient {
    /// # Errors
    /// HTTP クライアントの構築やベース URL の解析に失敗した場合はエラーを返す。
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f64,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build LLM client")?;

        // join() replaces the last path segment unless the base ends with '/'
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).context("invalid LLM base URL")?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            temperature,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or(LlmError::MissingApiKey)
    }
}

#[async_trait]
impl ReportGenerator for OpenAiClient {
    fn check_configured(&self) -> Result<(), LlmError> {
        self.api_key().map(|_| ())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key()?;
        let url = self
            .base_url
            .join("v1/responses")
            .map_err(|error| LlmError::Decode(format!("failed to build responses URL: {error}")))?;

        debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "sending narrative request to LLM"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&ResponsesRequest {
                model: &self.model,
                input: prompt,
                temperature: self.temperature,
            })
            .send()
            .await
            .map_err(LlmError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status,
                body: truncate_error_message(&body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|error| LlmError::Decode(error.to_string()))?;

        Ok(output_text(&body))
    }
}

/// Responses API の `output` から `output_text` 部分を連結する。
///
/// `output` に一つも無い場合はトップレベルの `output_text` を使う。どちらも
/// 無ければ空文字列（後段でプレースホルダに劣化する）。
fn output_text(body: &Value) -> String {
    let mut parts = Vec::new();
    for item in body
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        collect_output_text(item, &mut parts);
        for content in item
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            collect_output_text(content, &mut parts);
        }
    }

    if parts.is_empty() {
        return body
            .get("output_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }
    parts.concat()
}

fn collect_output_text<'a>(part: &'a Value, parts: &mut Vec<&'a str>) {
    if part.get("type").and_then(Value::as_str) == Some("output_text")
        && let Some(text) = part.get("text").and_then(Value::as_str)
    {
        parts.push(text);
    }
}
