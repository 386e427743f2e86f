use std::time::Duration;

use pharmassist_core::config::EndpointConfig;
use pharmassist_protocol::{ChatRequestBody, HealthResponse};
use tracing::{debug, warn};

use crate::error::{ChatError, Result};

/// HTTP side of a chat call: one streaming POST, plus the health probe.
#[derive(Debug, Clone)]
pub struct ChatTransport {
    client: reqwest::Client,
    chat_url: String,
    health_url: String,
}

impl ChatTransport {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = endpoint.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        Ok(Self {
            client: builder.build()?,
            chat_url: endpoint.chat_url(),
            health_url: endpoint.health_url(),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Send the request and return the response once its headers are in.
    ///
    /// A non-success status is an error and the body is left unread.
    pub async fn open(&self, body: &ChatRequestBody) -> Result<reqwest::Response> {
        debug!(url = %self.chat_url, messages = body.messages.len(), "opening chat stream");

        let resp = self
            .client
            .post(&self.chat_url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .json(body)
            .send()
            .await?;

        check_status(resp)
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(&self.health_url).send().await?;
        let resp = check_status(resp)?;
        Ok(resp.json().await?)
    }
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    warn!(status = status.as_u16(), url = %resp.url(), "chat server returned an error status");
    Err(ChatError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}
