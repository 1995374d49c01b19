//! HTTP client for the retrieval service.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use ragchat_core::config::USER_AGENT;
use ragchat_core::error::{Result, ServiceError};
use ragchat_core::service::{QueryRequest, QueryResponse, RetrievalApi};

/// Query timeout. This path performs model inference plus search and is
/// allowed to be slow; every other call in the client uses 10-15s.
const QUERY_TIMEOUT: Duration = Duration::from_secs(180);

/// Client for the retrieval service's `POST /query`.
#[derive(Clone)]
pub struct RetrievalClient {
    client: Client,
    base_url: String,
}

impl RetrievalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RetrievalApi for RetrievalClient {
    async fn query(&self, request: &QueryRequest, token: &str) -> Result<QueryResponse> {
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", USER_AGENT)
            .json(request)
            .timeout(QUERY_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "query request completed");
        match status {
            StatusCode::UNAUTHORIZED => return Err(ServiceError::AuthInvalid),
            StatusCode::FORBIDDEN => return Err(ServiceError::Forbidden),
            StatusCode::TOO_MANY_REQUESTS => return Err(ServiceError::RateLimited),
            status if !status.is_success() => {
                return Err(ServiceError::Server {
                    status: status.as_u16(),
                });
            }
            _ => {}
        }

        response.json::<QueryResponse>().await.map_err(|err| {
            ServiceError::unexpected(format!("malformed query response: {err}"))
        })
    }
}
