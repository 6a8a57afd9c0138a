use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{PainCareError, Result};
use crate::models::{GroqRequest, GroqResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &GroqRequest) -> Result<GroqResponse>;
}

/// Single-shot client for the Groq chat completions endpoint.
///
/// No retries: a failed call is reported to the caller once and the conversation
/// stays as it was. Hangs are bounded only by the configured request timeout.
pub struct GroqTransport {
    client: Client,
    api_key: String,
    api_url: String,
}

impl GroqTransport {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_key, api_url))
    }

    pub fn with_client(client: Client, api_key: String, api_url: String) -> Self {
        Self {
            client,
            api_key,
            api_url,
        }
    }
}

#[async_trait]
impl Transport for GroqTransport {
    async fn chat(&self, req: &GroqRequest) -> Result<GroqResponse> {
        tracing::debug!(model = %req.model, "Sending chat completion request to Groq");

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = status.as_u16(), "Groq API returned an error status");
            return Err(PainCareError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Failed to parse Groq API response: {}", e);
            PainCareError::Json(e)
        })
    }
}
