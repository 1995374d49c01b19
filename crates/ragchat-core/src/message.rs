//! Conversation message types.
//!
//! Messages are append-only within a chat session. An assistant message
//! carries the citations and source documents returned by the retrieval
//! service; citation *i* (1-based in display) pairs positionally with
//! `source_documents[i - 1]`.

use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the assistant.
    Assistant,
}

impl MessageRole {
    /// Parses a persisted role string. Anything that is not exactly
    /// `"user"` is treated as assistant output, since that is the only
    /// other author the chat store records.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("user") {
            Self::User
        } else {
            Self::Assistant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A document returned by the retrieval service alongside an answer.
///
/// Metadata fields are read-only and never mutated locally; only the
/// optional textual `content` is sanitized before display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub document_name: String,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub source_uri: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A single message in a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// Sanitized message content.
    pub content: String,
    /// Timestamp when the message was created (ISO 8601 format).
    pub timestamp: String,
    /// Citation strings, in display order.
    #[serde(default)]
    pub citations: Vec<String>,
    /// Source documents, positionally paired with `citations`.
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
}

impl ChatMessage {
    /// Creates a user message stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: now_rfc3339(),
            citations: Vec::new(),
            source_documents: Vec::new(),
        }
    }

    /// Creates an assistant message stamped with the current time.
    pub fn assistant(
        content: impl Into<String>,
        citations: Vec<String>,
        source_documents: Vec<SourceDocument>,
    ) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: now_rfc3339(),
            citations,
            source_documents,
        }
    }

    /// Pairs each citation with its source document by position.
    ///
    /// When the document list is shorter than the citation list the
    /// unmatched citations pair with `None`: the citation text is still
    /// shown, its metadata is simply absent.
    pub fn paired_sources(&self) -> impl Iterator<Item = (&str, Option<&SourceDocument>)> {
        self.citations
            .iter()
            .enumerate()
            .map(|(i, citation)| (citation.as_str(), self.source_documents.get(i)))
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
