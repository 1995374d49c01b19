//! HTTP client for the chat store.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use ragchat_core::config::USER_AGENT;
use ragchat_core::error::{Result, ServiceError};
use ragchat_core::service::ChatStoreApi;
use ragchat_core::session::SessionSummary;

const LIST_TIMEOUT: Duration = Duration::from_secs(15);
const DELETE_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the chat store's session directory.
#[derive(Clone)]
pub struct ChatStoreClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize, Default)]
struct SessionListResponse {
    #[serde(default)]
    sessions: Vec<SessionSummary>,
}

impl ChatStoreClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ChatStoreApi for ChatStoreClient {
    async fn list_sessions(&self, token: &str) -> Result<Vec<SessionSummary>> {
        let response = self
            .client
            .get(format!("{}/sessions", self.base_url))
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", USER_AGENT)
            .timeout(LIST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Server {
                status: status.as_u16(),
            });
        }

        let body: SessionListResponse = response.json().await.map_err(|err| {
            ServiceError::unexpected(format!("malformed session list response: {err}"))
        })?;
        tracing::debug!(count = body.sessions.len(), "fetched session directory");
        Ok(body.sessions)
    }

    async fn delete_session(&self, session_id: &str, token: &str) -> Result<bool> {
        let response = self
            .client
            .delete(format!("{}/sessions/{}", self.base_url, session_id))
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", USER_AGENT)
            .timeout(DELETE_TIMEOUT)
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}
