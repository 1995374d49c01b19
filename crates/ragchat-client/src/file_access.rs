//! HTTP client for the file access service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use ragchat_core::config::USER_AGENT;
use ragchat_core::error::{Result, ServiceError};
use ragchat_core::service::FileAccessApi;

const FILE_URL_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the file access service, which converts an internal
/// document locator into a time-limited fetchable URL.
#[derive(Clone)]
pub struct FileAccessClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct FileUrlRequest<'a> {
    source_uri: &'a str,
    document_name: &'a str,
}

#[derive(Deserialize)]
struct FileUrlResponse {
    file_url: String,
}

impl FileAccessClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl FileAccessApi for FileAccessClient {
    async fn file_url(
        &self,
        source_uri: &str,
        document_name: &str,
        token: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/get-file-url", self.base_url))
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", USER_AGENT)
            .json(&FileUrlRequest {
                source_uri,
                document_name,
            })
            .timeout(FILE_URL_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Server {
                status: status.as_u16(),
            });
        }

        let body: FileUrlResponse = response.json().await.map_err(|err| {
            ServiceError::unexpected(format!("malformed file-url response: {err}"))
        })?;
        Ok(body.file_url)
    }
}
