/// JSON Schema 2020-12 定義モジュール。
///
/// LLM が返す構造化出力の形を JSON Schema で定義し、実行時に検証する。
pub(crate) mod radar;

use serde_json::Value;

/// スキーマ検証結果。
#[derive(Debug)]
pub(crate) struct ValidationResult {
    pub(crate) valid: bool,
    pub(crate) errors: Vec<String>,
}

impl ValidationResult {
    pub(crate) fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub(crate) fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// JSON Schema でデータを検証する。
///
/// # Arguments
/// * `schema_json` - JSON Schema 定義
/// * `instance` - 検証対象のデータ
pub(crate) fn validate_json(schema_json: &Value, instance: &Value) -> ValidationResult {
    match jsonschema::validator_for(schema_json) {
        Ok(validator) => {
            let errors: Vec<String> = validator
                .iter_errors(instance)
                .map(|error| format!("{error} at {}", error.instance_path))
                .collect();
            if errors.is_empty() {
                ValidationResult::valid()
            } else {
                ValidationResult::invalid(errors)
            }
        }
        Err(error) => ValidationResult::invalid(vec![format!("Schema compilation error: {error}")]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_json_reports_each_failure() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "count": { "type": "integer" }
            },
            "required": ["name"]
        });

        let ok = validate_json(&schema, &json!({"name": "Moema", "count": 2}));
        assert!(ok.valid);
        assert!(ok.errors.is_empty());

        let bad = validate_json(&schema, &json!({"count": "two"}));
        assert!(!bad.valid);
        assert_eq!(bad.errors.len(), 2);
    }

    #[test]
    fn broken_schema_is_reported_as_invalid() {
        let schema = json!({"type": 12});
        let result = validate_json(&schema, &json!({}));
        assert!(!result.valid);
        assert!(result.errors[0].starts_with("Schema compilation error"));
    }
}
