//! Authenticated-session lifecycle.

use std::sync::Arc;
use tokio::sync::RwLock;

use ragchat_core::error::{Result, ServiceError};
use ragchat_core::service::AuthApi;

use crate::file_cache::FileUrlCache;
use crate::session_store::ChatSessionStore;

/// The bearer credential and the subject it belongs to.
///
/// Exactly one per active user context. Expiry is discovered via
/// verification, never decoded locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub subject_id: String,
}

/// Owns the [`AuthSession`] and drives login, signup, verification and
/// logout.
///
/// Every state-changing operation here is the only path permitted to
/// mutate the auth session. A fresh session invalidates all previously
/// cached chat data, so login and logout also reset the session store
/// and the file-URL cache.
pub struct AuthSessionManager {
    auth_api: Arc<dyn AuthApi>,
    state: RwLock<Option<AuthSession>>,
    sessions: Arc<ChatSessionStore>,
    file_urls: Arc<FileUrlCache>,
}

impl AuthSessionManager {
    pub fn new(
        auth_api: Arc<dyn AuthApi>,
        sessions: Arc<ChatSessionStore>,
        file_urls: Arc<FileUrlCache>,
    ) -> Self {
        Self {
            auth_api,
            state: RwLock::new(None),
            sessions,
            file_urls,
        }
    }

    /// Authenticates with the auth service and installs the resulting
    /// session, clearing any chat state left over from a previous
    /// account.
    pub async fn login(&self, user_id: &str, password: &str) -> Result<AuthSession> {
        let token = self.auth_api.login(user_id, password).await?;
        let session = AuthSession {
            token,
            subject_id: user_id.to_string(),
        };
        self.install(session.clone()).await;
        tracing::info!(subject_id = user_id, "login succeeded");
        Ok(session)
    }

    /// Creates an account. When the service returns a token this is an
    /// implicit login with the same state-clearing contract; otherwise
    /// the caller must follow up with a manual [`Self::login`].
    pub async fn signup(&self, user_id: &str, password: &str) -> Result<Option<AuthSession>> {
        match self.auth_api.signup(user_id, password).await? {
            Some(token) => {
                let session = AuthSession {
                    token,
                    subject_id: user_id.to_string(),
                };
                self.install(session.clone()).await;
                tracing::info!(subject_id = user_id, "signup with implicit login");
                Ok(Some(session))
            }
            None => {
                tracing::info!(subject_id = user_id, "signup succeeded, manual login required");
                Ok(None)
            }
        }
    }

    /// Verifies an externally supplied token (for example from a URL
    /// parameter) and installs it as the active session.
    pub async fn resume(&self, token: &str) -> Result<String> {
        match self.auth_api.verify(token).await {
            Ok(subject_id) => {
                self.install(AuthSession {
                    token: token.to_string(),
                    subject_id: subject_id.clone(),
                })
                .await;
                Ok(subject_id)
            }
            Err(err) => {
                self.clear_session().await;
                Err(err)
            }
        }
    }

    /// Verifies the stored token against the auth service.
    ///
    /// Fails closed: expiry, rejection and any network failure all
    /// clear the stored session and surface the error, never "assume
    /// still valid".
    pub async fn verify(&self) -> Result<String> {
        let token = match self.token().await {
            Some(token) => token,
            None => return Err(ServiceError::AuthInvalid),
        };

        match self.auth_api.verify(&token).await {
            Ok(subject_id) => Ok(subject_id),
            Err(err) => {
                tracing::warn!(error = %err, "token verification failed");
                self.clear_session().await;
                Err(err)
            }
        }
    }

    /// Unconditionally discards the auth session and all dependent
    /// state: session directory, message log and file-URL cache.
    pub async fn logout(&self) {
        self.clear_session().await;
        self.sessions.reset().await;
        self.file_urls.clear().await;
        tracing::info!("logged out");
    }

    /// Drops only the stored credential, leaving chat state alone.
    pub async fn clear_session(&self) {
        let mut state = self.state.write().await;
        *state = None;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.as_ref().map(|s| s.token.clone())
    }

    pub async fn subject_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.subject_id.clone())
    }

    async fn install(&self, session: AuthSession) {
        // A fresh session invalidates everything cached for the
        // previous one before the new credential becomes visible.
        self.sessions.reset().await;
        self.file_urls.clear().await;
        let mut state = self.state.write().await;
        *state = Some(session);
    }
}
