//! Trait and types for narrative analysis by a hosted language model.

use anyhow::Result;
use serde::Serialize;

/// Token accounting reported by the provider, when it reports any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Generated text plus the metadata needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Abstraction over an LLM provider (e.g., OpenAI).
#[async_trait::async_trait]
pub trait InsightApi: Send + Sync {
    /// Returns the model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Produces a narrative analysis of a station summary.
    async fn analyze(&self, data_summary: &str) -> Result<Insight>;

    /// Produces cartographic recommendations from a prior analysis.
    async fn design_recommendations(&self, analysis: &str, data_summary: &str) -> Result<Insight>;
}
