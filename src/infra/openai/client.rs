use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::prompts;
use crate::config::Settings;
use crate::error::StageError;
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient};
use crate::services::insight_api::{Insight, InsightApi, TokenUsage};

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct OpenAiClient<C> {
    http: ApiKey<C>,
    endpoint: String,
    model: String,
}

impl OpenAiClient<BasicClient> {
    /// Builds a client from configuration.
    ///
    /// Fails with [`StageError::MissingCredential`] when no API key is set,
    /// which downgrades the insight stage to skipped.
    pub fn from_settings(settings: &Settings) -> Result<Self, StageError> {
        let key = settings
            .openai_api_key
            .as_deref()
            .ok_or(StageError::MissingCredential("OPENAI_API_KEY is not set"))?;
        let http = BasicClient::with_timeout(REQUEST_TIMEOUT)
            .map_err(|_| StageError::NotConfigured("insight"))?;

        Self::new(http, key, &settings.openai_base_url, &settings.openai_model)
    }
}

impl<C: HttpClient> OpenAiClient<C> {
    pub fn new(inner: C, api_key: &str, base_url: &str, model: &str) -> Result<Self, StageError> {
        Ok(Self {
            http: ApiKey::bearer(inner, api_key)?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    /// Sends one system + user exchange and returns the first choice.
    #[tracing::instrument(skip(self, system, user), fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<Insight> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let mut req = reqwest::Request::new(reqwest::Method::POST, self.endpoint.parse()?);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(serde_json::to_vec(&body)?.into());

        debug!(prompt_chars = user.len(), "Sending chat completion request");
        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send chat completion request: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(anyhow::anyhow!("OpenAI API returned status {}: {}", status, message));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse chat completion response: {}", e))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("chat completion returned no content"))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        info!(
            total_tokens = usage.total_tokens,
            chars = text.len(),
            "Chat completion received"
        );

        Ok(Insight {
            text,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            usage,
        })
    }
}

#[async_trait]
impl<C: HttpClient> InsightApi for OpenAiClient<C> {
    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, data_summary: &str) -> Result<Insight> {
        self.complete(prompts::ANALYST_SYSTEM, &prompts::data_analysis(data_summary))
            .await
    }

    async fn design_recommendations(&self, analysis: &str, data_summary: &str) -> Result<Insight> {
        self.complete(
            prompts::CARTOGRAPHER_SYSTEM,
            &prompts::map_design(analysis, data_summary),
        )
        .await
    }
}
