pub mod llm;
pub mod news;

pub use llm::{LlmError, OpenAiClient, ReportGenerator};
pub use news::{BingNewsClient, DisabledNews, NewsSource};
