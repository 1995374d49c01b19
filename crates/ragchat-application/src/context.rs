//! Wires the application components together behind one facade.

use std::sync::Arc;
use tokio::sync::RwLock;

use ragchat_client::{AuthClient, ChatStoreClient, FileAccessClient, RetrievalClient};
use ragchat_core::config::Endpoints;
use ragchat_core::error::{Result, ServiceError};
use ragchat_core::filters::{FilterKey, FilterSet};
use ragchat_core::message::ChatMessage;
use ragchat_core::service::{AuthApi, ChatStoreApi, FileAccessApi, RetrievalApi};
use ragchat_core::session::SessionSummary;

use crate::auth_manager::{AuthSession, AuthSessionManager};
use crate::file_cache::FileUrlCache;
use crate::orchestrator::{QueryOutcome, RetrievalOrchestrator};
use crate::session_store::ChatSessionStore;

/// Everything one chat front-end instance needs, wired together.
///
/// The context owns the active filter set and mediates every operation
/// that needs the bearer token, so callers never juggle credentials
/// themselves. Operations other than login and signup require an
/// authenticated session and fail with [`ServiceError::AuthInvalid`]
/// without one.
pub struct ChatContext {
    auth: AuthSessionManager,
    sessions: Arc<ChatSessionStore>,
    orchestrator: RetrievalOrchestrator,
    file_urls: Arc<FileUrlCache>,
    filters: RwLock<FilterSet>,
}

impl ChatContext {
    /// Assembles a context from trait objects; tests inject mocks here.
    pub fn new(
        auth_api: Arc<dyn AuthApi>,
        chat_api: Arc<dyn ChatStoreApi>,
        retrieval_api: Arc<dyn RetrievalApi>,
        file_api: Option<Arc<dyn FileAccessApi>>,
    ) -> Self {
        let sessions = Arc::new(ChatSessionStore::new(chat_api));
        let file_urls = Arc::new(FileUrlCache::new(file_api));
        let auth = AuthSessionManager::new(auth_api, sessions.clone(), file_urls.clone());
        let orchestrator = RetrievalOrchestrator::new(retrieval_api, sessions.clone());
        Self {
            auth,
            sessions,
            orchestrator,
            file_urls,
            filters: RwLock::new(FilterSet::new()),
        }
    }

    /// Builds a context backed by the HTTP clients for the configured
    /// service endpoints.
    pub fn from_endpoints(endpoints: &Endpoints) -> Self {
        let file_api: Option<Arc<dyn FileAccessApi>> = endpoints
            .file_access_url
            .as_deref()
            .map(|url| Arc::new(FileAccessClient::new(url)) as Arc<dyn FileAccessApi>);
        Self::new(
            Arc::new(AuthClient::new(&endpoints.auth_url)),
            Arc::new(ChatStoreClient::new(&endpoints.chat_url)),
            Arc::new(RetrievalClient::new(&endpoints.retrieval_url)),
            file_api,
        )
    }

    pub async fn login(&self, user_id: &str, password: &str) -> Result<AuthSession> {
        self.auth.login(user_id, password).await
    }

    pub async fn signup(&self, user_id: &str, password: &str) -> Result<Option<AuthSession>> {
        self.auth.signup(user_id, password).await
    }

    pub async fn resume(&self, token: &str) -> Result<String> {
        self.auth.resume(token).await
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated().await
    }

    pub async fn subject_id(&self) -> Option<String> {
        self.auth.subject_id().await
    }

    /// Sends one prompt through the retrieval pipeline with the active
    /// filter set.
    ///
    /// An authentication failure from the retrieval service clears the
    /// stored session before the error propagates, so the next call
    /// fails fast locally instead of retrying a dead token.
    pub async fn send(&self, prompt: &str) -> Result<QueryOutcome> {
        let token = self.require_token().await?;
        let filters = self.filters.read().await.clone();
        match self.orchestrator.query(prompt, &token, &filters).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if err.is_auth_failure() {
                    tracing::warn!(error = %err, "query rejected for auth reasons, clearing session");
                    self.auth.clear_session().await;
                }
                Err(err)
            }
        }
    }

    /// Re-fetches the session directory from the chat store.
    pub async fn refresh_sessions(&self) -> Result<Vec<SessionSummary>> {
        let token = self.require_token().await?;
        Ok(self.sessions.refresh(&token).await)
    }

    pub async fn session_directory(&self) -> Vec<SessionSummary> {
        self.sessions.sessions().await
    }

    /// Deletes a stored session. Returns whether the store confirmed
    /// the deletion.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let token = self.require_token().await?;
        Ok(self.sessions.delete(session_id, &token).await)
    }

    /// Loads a stored session's transcript into the active conversation.
    pub async fn open_session(&self, session_id: &str) -> Result<()> {
        self.require_token().await?;
        self.sessions.load(session_id).await
    }

    /// Detaches from the current session so the next query starts a new
    /// one.
    pub async fn new_chat(&self) {
        self.sessions.start_new().await;
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.sessions.messages().await
    }

    pub async fn current_title(&self) -> String {
        self.sessions.current_title().await
    }

    /// Resolves a citation's file link through the TTL cache. `None`
    /// means the link is unavailable and the citation renders plain.
    pub async fn resolve_file_url(&self, source_uri: &str, document_name: &str) -> Option<String> {
        let token = self.auth.token().await?;
        self.file_urls.resolve(source_uri, document_name, &token).await
    }

    /// Sets one filter value. Returns whether the value survived
    /// sanitization.
    pub async fn set_filter(&self, key: FilterKey, value: &str) -> bool {
        self.filters.write().await.insert(key, value)
    }

    pub async fn remove_filter(&self, key: FilterKey) -> Option<String> {
        self.filters.write().await.remove(key)
    }

    pub async fn clear_filters(&self) {
        self.filters.write().await.clear();
    }

    pub async fn filters(&self) -> FilterSet {
        self.filters.read().await.clone()
    }

    async fn require_token(&self) -> Result<String> {
        self.auth.token().await.ok_or(ServiceError::AuthInvalid)
    }
}
