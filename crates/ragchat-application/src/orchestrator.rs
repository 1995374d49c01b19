//! Query dispatch and response normalization.

use std::collections::BTreeMap;
use std::sync::Arc;

use ragchat_core::error::{Result, ServiceError};
use ragchat_core::filters::{FilterKey, FilterSet};
use ragchat_core::message::{ChatMessage, SourceDocument};
use ragchat_core::sanitize::{MAX_TEXT_CHARS, sanitize};
use ragchat_core::service::{QueryRequest, RetrievalApi};
use ragchat_core::session::UNTITLED_CHAT;

use crate::session_store::ChatSessionStore;

/// Shown in place of a reply the service omitted or that sanitization
/// emptied out, so the transcript never carries a blank assistant turn.
const EMPTY_REPLY_FALLBACK: &str = "No answer could be retrieved. Please try again.";

/// A session the retrieval service created for this conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub session_id: String,
    pub title: String,
}

/// Normalized, sanitized result of one retrieval query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub reply: String,
    pub citations: Vec<String>,
    pub source_documents: Vec<SourceDocument>,
    /// Set when this query started the conversation's stored session.
    pub new_session: Option<NewSession>,
    /// Advisory per-document filter-match diagnostics, index-aligned
    /// with `source_documents`. Never used to discard documents; the
    /// server's filtering decision is authoritative.
    pub document_matches: Vec<BTreeMap<FilterKey, bool>>,
}

/// Dispatches queries to the retrieval service, sanitizes and
/// normalizes responses, and keeps the session store in step.
pub struct RetrievalOrchestrator {
    retrieval_api: Arc<dyn RetrievalApi>,
    store: Arc<ChatSessionStore>,
}

impl RetrievalOrchestrator {
    pub fn new(retrieval_api: Arc<dyn RetrievalApi>, store: Arc<ChatSessionStore>) -> Self {
        Self {
            retrieval_api,
            store,
        }
    }

    /// Runs one query round-trip.
    ///
    /// Validation failures reject before any network call is made. An
    /// oversized prompt is rejected rather than silently truncated, so
    /// the user's intent is never sent in a mangled form. On success
    /// the user and assistant messages are appended to the store in
    /// that order, and a newly created session id is adopted and the
    /// directory refreshed.
    pub async fn query(
        &self,
        prompt: &str,
        token: &str,
        filters: &FilterSet,
    ) -> Result<QueryOutcome> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::validation("prompt must not be empty"));
        }
        if trimmed.chars().count() > MAX_TEXT_CHARS {
            return Err(ServiceError::validation(format!(
                "prompt exceeds {MAX_TEXT_CHARS} characters"
            )));
        }

        let message = sanitize(trimmed);
        if message.is_empty() {
            return Err(ServiceError::validation("prompt must not be empty"));
        }

        let request = QueryRequest {
            message: message.clone(),
            filters: filters.clone(),
            session_id: self.store.current_session_id().await,
        };

        tracing::debug!(
            session_id = ?request.session_id,
            filters = filters.len(),
            "dispatching retrieval query"
        );
        let response = self.retrieval_api.query(&request, token).await?;

        let mut reply = sanitize(&response.reply);
        if reply.is_empty() {
            reply = EMPTY_REPLY_FALLBACK.to_string();
        }
        let citations: Vec<String> = response.citations.iter().map(|c| sanitize(c)).collect();
        let source_documents: Vec<SourceDocument> = response
            .source_documents
            .into_iter()
            .map(|doc| SourceDocument {
                content: doc.content.as_deref().map(sanitize),
                ..doc
            })
            .collect();
        let document_matches = source_documents
            .iter()
            .map(|doc| filters.match_document(doc))
            .collect();

        self.store.append(ChatMessage::user(message)).await;
        self.store
            .append(ChatMessage::assistant(
                reply.clone(),
                citations.clone(),
                source_documents.clone(),
            ))
            .await;

        let new_session = if response.is_new_session {
            match response.session_id {
                Some(session_id) => {
                    let title = response
                        .title
                        .map(|t| sanitize(&t))
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| UNTITLED_CHAT.to_string());
                    self.store
                        .adopt_new_session(session_id.clone(), title.clone())
                        .await;
                    self.store.refresh(token).await;
                    Some(NewSession { session_id, title })
                }
                None => {
                    tracing::warn!("retrieval service reported a new session without an id");
                    None
                }
            }
        } else {
            None
        };

        Ok(QueryOutcome {
            reply,
            citations,
            source_documents,
            new_session,
            document_matches,
        })
    }
}
