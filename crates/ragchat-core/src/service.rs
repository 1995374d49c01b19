//! Service traits for the four HTTP collaborators.
//!
//! The orchestration layer depends on these traits only; the concrete
//! reqwest clients live in `ragchat-client` and tests supply mock
//! implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filters::FilterSet;
use crate::message::SourceDocument;
use crate::session::SessionSummary;

/// Auth service: login, signup and bearer-token verification.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, user_id: &str, password: &str) -> Result<String>;

    /// Creates an account. Returns a token when the service logs the
    /// new account in implicitly, `None` when a manual login is
    /// required afterwards.
    async fn signup(&self, user_id: &str, password: &str) -> Result<Option<String>>;

    /// Verifies a bearer token and returns the subject id it belongs
    /// to. Expired tokens fail with `AuthExpired`, other 401 causes
    /// with `AuthInvalid`; transport failures are verification
    /// failures, never "assume still valid".
    async fn verify(&self, token: &str) -> Result<String>;
}

/// Chat store: the session directory and per-session persistence.
#[async_trait]
pub trait ChatStoreApi: Send + Sync {
    async fn list_sessions(&self, token: &str) -> Result<Vec<SessionSummary>>;

    /// Deletes a session. `Ok(false)` means the store refused the
    /// deletion without a transport or auth failure.
    async fn delete_session(&self, session_id: &str, token: &str) -> Result<bool>;
}

/// Retrieval service: grounded question answering over the corpus.
#[async_trait]
pub trait RetrievalApi: Send + Sync {
    async fn query(&self, request: &QueryRequest, token: &str) -> Result<QueryResponse>;
}

/// File access service: converts an internal document locator into a
/// time-limited fetchable URL. Optional collaborator.
#[async_trait]
pub trait FileAccessApi: Send + Sync {
    async fn file_url(&self, source_uri: &str, document_name: &str, token: &str)
    -> Result<String>;
}

/// Payload for the retrieval service's `POST /query`.
///
/// `session_id` is included only when a conversation is already in
/// progress; on the first query of a conversation the service creates
/// the session and reports its id back.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub message: String,
    pub filters: FilterSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Response body of the retrieval service's `POST /query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
    #[serde(default)]
    pub is_new_session: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_request_omits_absent_session_id() {
        let request = QueryRequest {
            message: "hello".into(),
            filters: FilterSet::new(),
            session_id: None,
        };
        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"message": "hello", "filters": {}}));
    }

    #[test]
    fn query_request_includes_bound_session_id() {
        let request = QueryRequest {
            message: "hello".into(),
            filters: FilterSet::apply([("product", "acme")]),
            session_id: Some("s-42".into()),
        };
        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(json["session_id"], "s-42");
        assert_eq!(json["filters"]["product"], "acme");
    }

    #[test]
    fn query_response_tolerates_sparse_bodies() {
        let response: QueryResponse = serde_json::from_str(r#"{"reply":"hi"}"#).unwrap();
        assert_eq!(response.reply, "hi");
        assert!(!response.is_new_session);
        assert!(response.citations.is_empty());
        assert!(response.session_id.is_none());
    }
}
