//! OpenAI chat-completions adapter for [`InsightApi`](crate::services::insight_api::InsightApi).

mod client;
pub mod prompts;

pub use client::OpenAiClient;
