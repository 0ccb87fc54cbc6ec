//! LLM 応答テキストから報告文を復元する。
//!
//! 応答が壊れていても失敗はさせず、空のリストとプレースホルダの要約に
//! 劣化させる。スコア自体は LLM 呼び出し前に確定している。

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::RadarItem;
use crate::schema::{radar::RADAR_ITEM_SCHEMA, validate_json};

pub const PLACEHOLDER_SUMMARY: &str = "Relatório gerado.";

const MAX_LIST_ITEMS: usize = 5;
const MAX_RADAR_ITEMS: usize = 5;

// Greedy: first '{' through last '}'
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid JSON object regex"));

/// テキスト全体を JSON として読み、だめなら最初の `{` から最後の `}` までを読む。
///
/// どちらでも JSON オブジェクトにならなければ `None`。
#[must_use]
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(object);
    }
    let span = JSON_OBJECT.find(text)?;
    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    pub summary: String,
    pub positives: Vec<String>,
    pub cautions: Vec<String>,
    pub risks: Vec<String>,
    pub radar: Vec<RadarItem>,
}

impl Narrative {
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            summary: PLACEHOLDER_SUMMARY.to_string(),
            positives: Vec::new(),
            cautions: Vec::new(),
            risks: Vec::new(),
            radar: Vec::new(),
        }
    }

    /// LLM の生テキストから組み立てる。
    ///
    /// JSON オブジェクトが取り出せなければ `None`。個々のフィールドの不備は
    /// [`Narrative::from_object`] 側で吸収する。
    #[must_use]
    pub fn from_llm_text(text: &str) -> Option<Self> {
        extract_json_object(text).map(|object| Self::from_object(&object))
    }

    #[must_use]
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let summary = match object.get("summary") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.trim().to_string(),
            Some(other) => other.to_string(),
        };

        Self {
            summary: if summary.is_empty() {
                PLACEHOLDER_SUMMARY.to_string()
            } else {
                summary
            },
            positives: string_list(object.get("positives")),
            cautions: string_list(object.get("cautions")),
            risks: string_list(object.get("risks")),
            radar: radar_items(object.get("radar")),
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::String(text) => Some(text.trim().to_string()),
            other => Some(other.to_string()),
        })
        .filter(|text| !text.is_empty())
        .take(MAX_LIST_ITEMS)
        .collect()
}

/// 先頭 5 件を検証し、一件でも不正ならレーダー全体を空にする。
fn radar_items(value: Option<&Value>) -> Vec<RadarItem> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    let mut radar = Vec::with_capacity(items.len().min(MAX_RADAR_ITEMS));
    for (index, item) in items.iter().take(MAX_RADAR_ITEMS).enumerate() {
        let validation = validate_json(&RADAR_ITEM_SCHEMA, item);
        if !validation.valid {
            warn!(
                index,
                errors = ?validation.errors,
                "radar item failed JSON Schema validation; dropping radar"
            );
            return Vec::new();
        }
        match serde_json::from_value::<RadarItem>(item.clone()) {
            Ok(parsed) => radar.push(parsed),
            Err(error) => {
                warn!(index, error = %error, "radar item could not be decoded; dropping radar");
                return Vec::new();
            }
        }
    }
    radar
}
