/// 周辺レーダー項目の JSON Schema 定義。
use std::sync::LazyLock;

use serde_json::{Value, json};

/// LLM が返す `radar[]` の一項目。
pub(crate) static RADAR_ITEM_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://alt.dev/schemas/decision-engine/radar-item.json",
        "title": "Radar Item",
        "description": "One neighbourhood event surfaced by the narrative generator",
        "type": "object",
        "properties": {
            "impact": {
                "type": "string",
                "enum": ["positive", "monitor", "risk"]
            },
            "title": { "type": "string" },
            "date": { "type": ["string", "null"] },
            "why_it_matters": { "type": "string" },
            "source": { "type": ["string", "null"] }
        },
        "required": ["impact", "title", "why_it_matters"]
    })
});
