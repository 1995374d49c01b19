//! Chat session summaries as persisted by the chat store.

use serde::{Deserialize, Serialize};

use crate::message::SourceDocument;

/// Title shown for a conversation that has not been bound to a stored
/// session yet.
pub const NEW_CHAT_TITLE: &str = "New chat";

/// Fallback title for stored sessions with no usable title.
pub const UNTITLED_CHAT: &str = "Untitled chat";

/// A session summary returned by the chat store's `GET /sessions`.
///
/// The store may or may not include the persisted message log; when it
/// does, the messages are treated as untrusted input and re-sanitized
/// before entering the in-memory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<PersistedMessage>,
}

impl SessionSummary {
    /// The display title, falling back for empty titles.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED_CHAT
        } else {
            &self.title
        }
    }
}

/// A message as persisted by the chat store.
///
/// The role arrives as a free-form string and every textual field is
/// unsanitized; conversion into a [`crate::message::ChatMessage`]
/// happens in the session store, which re-sanitizes on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_title_falls_back_when_empty() {
        let summary = SessionSummary {
            session_id: "s1".into(),
            title: "  ".into(),
            created_at: None,
            messages: Vec::new(),
        };
        assert_eq!(summary.display_title(), UNTITLED_CHAT);
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let summary: SessionSummary =
            serde_json::from_str(r#"{"session_id":"s1","title":"Billing"}"#).unwrap();
        assert_eq!(summary.session_id, "s1");
        assert!(summary.messages.is_empty());
        assert!(summary.created_at.is_none());
    }
}
