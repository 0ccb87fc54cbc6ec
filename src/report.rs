//! LLM 向けプロンプトの構築と、応答からの報告文の復元。

pub mod narrative;
pub mod prompt;

pub use narrative::{Narrative, PLACEHOLDER_SUMMARY, extract_json_object};
pub use prompt::build_prompt;
