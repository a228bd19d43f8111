use crate::refine::{RewriteError, RewriteRequest, RewriteService};
use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RewriteResponse {
    refined_content: String,
}

/// Talks to an HTTP rewrite endpoint. The request body is the serialized
/// `RewriteRequest`; the endpoint answers `{"refined_content": "..."}`.
pub struct HttpRewriteService {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpRewriteService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to construct HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

#[async_trait::async_trait]
impl RewriteService for HttpRewriteService {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RewriteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RewriteError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: RewriteResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::BadResponse(e.to_string()))?;
        if body.refined_content.trim().is_empty() {
            return Err(RewriteError::BadResponse(
                "empty refined content".to_string(),
            ));
        }
        Ok(body.refined_content)
    }
}
