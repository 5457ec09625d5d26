use crate::error::StageError;
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects a credential as an HTTP header.
///
/// The header is validated once at construction so that `execute` cannot fail
/// on a malformed key.
pub struct ApiKey<C> {
    pub inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    /// Uses `Authorization: Bearer <key>`, the scheme hosted LLM APIs expect.
    pub fn bearer(inner: C, key: &str) -> Result<Self, StageError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(StageError::MissingCredential("API key is empty"));
        }
        let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| StageError::InvalidCredential)?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name: AUTHORIZATION,
            value,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}
