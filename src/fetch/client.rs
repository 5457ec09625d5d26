use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for every outbound HTTP call (GBFS feeds and the LLM API).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
