//! HTTP client for the auth service.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use ragchat_core::config::USER_AGENT;
use ragchat_core::error::{Result, ServiceError};
use ragchat_core::service::AuthApi;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(15);
const SIGNUP_TIMEOUT: Duration = Duration::from_secs(15);
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the auth service's login, signup and verify endpoints.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    user_id: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize, Default)]
struct SignupResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn error_body(response: reqwest::Response) -> ErrorBody {
        response.json::<ErrorBody>().await.unwrap_or_default()
    }

    /// Classifies the auth service's reported login failure reason.
    fn classify_login_error(message: &str) -> ServiceError {
        let lower = message.to_lowercase();
        if lower.contains("invalid") || lower.contains("password") {
            ServiceError::InvalidCredentials
        } else if lower.contains("locked") {
            ServiceError::AccountLocked
        } else {
            ServiceError::unexpected(format!("login failed: {message}"))
        }
    }

    fn classify_signup_error(message: &str) -> ServiceError {
        let lower = message.to_lowercase();
        if lower.contains("already exists") {
            ServiceError::validation("an account with this identifier already exists")
        } else if lower.contains("email") || lower.contains("password") {
            ServiceError::validation(format!("signup rejected: {message}"))
        } else {
            ServiceError::unexpected(format!("signup failed: {message}"))
        }
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn login(&self, user_id: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .header("User-Agent", USER_AGENT)
            .json(&CredentialsRequest { user_id, password })
            .timeout(LOGIN_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            let body: TokenResponse = response
                .json()
                .await
                .map_err(|err| ServiceError::unexpected(format!("malformed login response: {err}")))?;
            return Ok(body.token);
        }

        let body = Self::error_body(response).await;
        let message = body.error.unwrap_or_else(|| "Unknown error".to_string());
        tracing::debug!(reason = %message, "login rejected");
        Err(Self::classify_login_error(&message))
    }

    async fn signup(&self, user_id: &str, password: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(format!("{}/signup", self.base_url))
            .header("User-Agent", USER_AGENT)
            .json(&CredentialsRequest { user_id, password })
            .timeout(SIGNUP_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            let body: SignupResponse = response.json().await.unwrap_or_default();
            return Ok(body.token);
        }

        let body = Self::error_body(response).await;
        let message = body.error.unwrap_or_else(|| "Unknown error".to_string());
        Err(Self::classify_signup_error(&message))
    }

    async fn verify(&self, token: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct VerifyResponse {
            user_id: String,
        }

        let response = self
            .client
            .get(format!("{}/verify", self.base_url))
            .header("Authorization", format!("Bearer {token}"))
            .header("User-Agent", USER_AGENT)
            .timeout(VERIFY_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: VerifyResponse = response.json().await.map_err(|err| {
                ServiceError::unexpected(format!("malformed verify response: {err}"))
            })?;
            return Ok(body.user_id);
        }

        if status == StatusCode::UNAUTHORIZED {
            let body = Self::error_body(response).await;
            return match body.code.as_deref() {
                Some("TOKEN_EXPIRED") => Err(ServiceError::AuthExpired),
                _ => Err(ServiceError::AuthInvalid),
            };
        }

        Err(ServiceError::Server {
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_errors_classify_by_reported_reason() {
        assert_eq!(
            AuthClient::classify_login_error("Invalid user or password"),
            ServiceError::InvalidCredentials
        );
        assert_eq!(
            AuthClient::classify_login_error("account is LOCKED"),
            ServiceError::AccountLocked
        );
        assert!(matches!(
            AuthClient::classify_login_error("quota exceeded"),
            ServiceError::Unexpected(_)
        ));
    }

    #[test]
    fn signup_errors_classify_by_reported_reason() {
        assert!(matches!(
            AuthClient::classify_signup_error("user already exists"),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            AuthClient::classify_signup_error("password too weak"),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            AuthClient::classify_signup_error("backend unavailable"),
            ServiceError::Unexpected(_)
        ));
    }
}
