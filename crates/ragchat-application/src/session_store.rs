//! Local view of chat sessions and the in-memory message log.

use std::sync::Arc;
use tokio::sync::RwLock;

use ragchat_core::error::{Result, ServiceError};
use ragchat_core::message::{ChatMessage, MessageRole, SourceDocument};
use ragchat_core::sanitize::sanitize;
use ragchat_core::service::ChatStoreApi;
use ragchat_core::session::{NEW_CHAT_TITLE, PersistedMessage, SessionSummary};

/// Binding state of the current conversation.
///
/// The retrieval service creates a session implicitly on the first
/// query of a conversation; once its id is adopted the transition is
/// one-way for that conversation instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Conversation {
    /// No stored session is bound; the next query starts one.
    #[default]
    NoSession,
    /// The conversation is bound to a stored session id.
    Bound(String),
}

#[derive(Default)]
struct StoreState {
    directory: Vec<SessionSummary>,
    conversation: Conversation,
    messages: Vec<ChatMessage>,
}

/// Owns the session directory, the current-session pointer and the
/// in-memory message log.
///
/// Loading a different session replaces the log wholesale; messages are
/// never shared by reference across sessions.
pub struct ChatSessionStore {
    chat_api: Arc<dyn ChatStoreApi>,
    state: RwLock<StoreState>,
}

impl ChatSessionStore {
    pub fn new(chat_api: Arc<dyn ChatStoreApi>) -> Self {
        Self {
            chat_api,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Fetches the session directory from the chat store.
    ///
    /// Soft-fails to an empty list: a listing failure is logged for
    /// observability but never raised to the caller.
    pub async fn refresh(&self, token: &str) -> Vec<SessionSummary> {
        let sessions = match self.chat_api.list_sessions(token).await {
            Ok(sessions) => sessions,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list chat sessions");
                Vec::new()
            }
        };

        let mut state = self.state.write().await;
        state.directory = sessions.clone();
        sessions
    }

    /// The cached session directory.
    pub async fn sessions(&self) -> Vec<SessionSummary> {
        self.state.read().await.directory.clone()
    }

    /// Deletes a session from the chat store.
    ///
    /// On success the session leaves the cached directory, and when the
    /// deleted session is the active one the store auto-transitions to
    /// the new-chat state so no dangling pointer remains.
    pub async fn delete(&self, session_id: &str, token: &str) -> bool {
        let deleted = match self.chat_api.delete_session(session_id, token).await {
            Ok(deleted) => deleted,
            Err(err) => {
                tracing::warn!(error = %err, session_id, "failed to delete chat session");
                false
            }
        };
        if !deleted {
            return false;
        }

        let mut state = self.state.write().await;
        state.directory.retain(|s| s.session_id != session_id);
        if state.conversation == Conversation::Bound(session_id.to_string()) {
            state.conversation = Conversation::NoSession;
            state.messages.clear();
        }
        true
    }

    /// Starts a new chat: clears the current-session pointer and the
    /// message log without touching the chat store.
    pub async fn start_new(&self) {
        let mut state = self.state.write().await;
        state.conversation = Conversation::NoSession;
        state.messages.clear();
    }

    /// Binds the conversation to the session id the retrieval service
    /// just created.
    ///
    /// The transition is one-way: once bound, later reports are ignored
    /// and the existing id keeps being reused.
    pub async fn adopt_new_session(&self, session_id: String, title: String) {
        let mut state = self.state.write().await;
        if let Conversation::Bound(existing) = &state.conversation {
            tracing::warn!(
                existing,
                reported = session_id,
                "conversation already bound; ignoring new session id"
            );
            return;
        }

        if !state.directory.iter().any(|s| s.session_id == session_id) {
            // Provisional entry until the next directory refresh.
            state.directory.insert(
                0,
                SessionSummary {
                    session_id: session_id.clone(),
                    title,
                    created_at: None,
                    messages: Vec::new(),
                },
            );
        }
        state.conversation = Conversation::Bound(session_id);
    }

    /// Loads a stored session, replacing the in-memory log wholesale.
    ///
    /// Persisted data from the chat store is treated as untrusted
    /// input: every message is individually re-sanitized on the way in.
    pub async fn load(&self, session_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let summary = state
            .directory
            .iter()
            .find(|s| s.session_id == session_id)
            .ok_or_else(|| {
                ServiceError::unexpected(format!("unknown session id: {session_id}"))
            })?;

        let messages = summary.messages.iter().map(resanitize).collect();
        state.messages = messages;
        state.conversation = Conversation::Bound(session_id.to_string());
        Ok(())
    }

    /// Appends a message to the current log.
    pub async fn append(&self, message: ChatMessage) {
        let mut state = self.state.write().await;
        state.messages.push(message);
    }

    /// A snapshot of the current message log.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    /// The bound session id, if any.
    pub async fn current_session_id(&self) -> Option<String> {
        match &self.state.read().await.conversation {
            Conversation::NoSession => None,
            Conversation::Bound(id) => Some(id.clone()),
        }
    }

    /// Sanitized display title of the current conversation.
    pub async fn current_title(&self) -> String {
        let state = self.state.read().await;
        match &state.conversation {
            Conversation::NoSession => NEW_CHAT_TITLE.to_string(),
            Conversation::Bound(id) => {
                let title = state
                    .directory
                    .iter()
                    .find(|s| &s.session_id == id)
                    .map(|s| s.display_title())
                    .unwrap_or(ragchat_core::session::UNTITLED_CHAT);
                sanitize(title)
            }
        }
    }

    /// Discards everything: directory, pointer and message log. Used on
    /// logout and on login to prevent cross-account leakage.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = StoreState::default();
    }
}

/// Converts a persisted message into a sanitized in-memory message.
/// Document metadata is kept untouched; only textual content is
/// sanitized.
fn resanitize(persisted: &PersistedMessage) -> ChatMessage {
    ChatMessage {
        role: MessageRole::parse(&persisted.role),
        content: sanitize(&persisted.content),
        timestamp: persisted.timestamp.clone(),
        citations: persisted.citations.iter().map(|c| sanitize(c)).collect(),
        source_documents: persisted
            .source_documents
            .iter()
            .map(|doc| SourceDocument {
                content: doc.content.as_deref().map(sanitize),
                ..doc.clone()
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockChatStore {
        sessions: Mutex<Vec<SessionSummary>>,
        fail_list: bool,
        refuse_delete: bool,
    }

    impl MockChatStore {
        fn new(sessions: Vec<SessionSummary>) -> Self {
            Self {
                sessions: Mutex::new(sessions),
                fail_list: false,
                refuse_delete: false,
            }
        }
    }

    #[async_trait]
    impl ChatStoreApi for MockChatStore {
        async fn list_sessions(&self, _token: &str) -> Result<Vec<SessionSummary>> {
            if self.fail_list {
                return Err(ServiceError::Timeout);
            }
            Ok(self.sessions.lock().unwrap().clone())
        }

        async fn delete_session(&self, session_id: &str, _token: &str) -> Result<bool> {
            if self.refuse_delete {
                return Ok(false);
            }
            let mut sessions = self.sessions.lock().unwrap();
            let before = sessions.len();
            sessions.retain(|s| s.session_id != session_id);
            Ok(sessions.len() < before)
        }
    }

    fn summary(id: &str, title: &str) -> SessionSummary {
        SessionSummary {
            session_id: id.to_string(),
            title: title.to_string(),
            created_at: None,
            messages: Vec::new(),
        }
    }

    #[tokio::test]
    async fn refresh_soft_fails_to_empty_list() {
        let mut api = MockChatStore::new(vec![summary("s1", "One")]);
        api.fail_list = true;
        let store = ChatSessionStore::new(Arc::new(api));

        let sessions = store.refresh("token").await;
        assert!(sessions.is_empty());
        assert!(store.sessions().await.is_empty());
    }

    #[tokio::test]
    async fn deleting_the_active_session_transitions_to_new_chat() {
        let api = MockChatStore::new(vec![summary("s1", "One"), summary("s2", "Two")]);
        let store = ChatSessionStore::new(Arc::new(api));
        store.refresh("token").await;

        store.adopt_new_session("s1".into(), "One".into()).await;
        store.append(ChatMessage::user("hello")).await;

        assert!(store.delete("s1", "token").await);
        assert_eq!(store.current_session_id().await, None);
        assert!(store.messages().await.is_empty());
        assert_eq!(store.current_title().await, NEW_CHAT_TITLE);
    }

    #[tokio::test]
    async fn deleting_an_inactive_session_keeps_the_log() {
        let api = MockChatStore::new(vec![summary("s1", "One"), summary("s2", "Two")]);
        let store = ChatSessionStore::new(Arc::new(api));
        store.refresh("token").await;

        store.adopt_new_session("s1".into(), "One".into()).await;
        store.append(ChatMessage::user("hello")).await;

        assert!(store.delete("s2", "token").await);
        assert_eq!(store.current_session_id().await, Some("s1".into()));
        assert_eq!(store.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn refused_deletion_changes_nothing() {
        let mut api = MockChatStore::new(vec![summary("s1", "One")]);
        api.refuse_delete = true;
        let store = ChatSessionStore::new(Arc::new(api));
        store.refresh("token").await;
        store.adopt_new_session("s1".into(), "One".into()).await;

        assert!(!store.delete("s1", "token").await);
        assert_eq!(store.current_session_id().await, Some("s1".into()));
    }

    #[tokio::test]
    async fn adoption_is_one_way_per_conversation() {
        let api = MockChatStore::new(Vec::new());
        let store = ChatSessionStore::new(Arc::new(api));

        store.adopt_new_session("first".into(), "First".into()).await;
        store.adopt_new_session("second".into(), "Second".into()).await;

        assert_eq!(store.current_session_id().await, Some("first".into()));
    }

    #[tokio::test]
    async fn start_new_clears_pointer_and_log_only() {
        let api = MockChatStore::new(vec![summary("s1", "One")]);
        let store = ChatSessionStore::new(Arc::new(api));
        store.refresh("token").await;
        store.adopt_new_session("s1".into(), "One".into()).await;
        store.append(ChatMessage::user("hello")).await;

        store.start_new().await;

        assert_eq!(store.current_session_id().await, None);
        assert!(store.messages().await.is_empty());
        // Directory survives; only the conversation state is reset.
        assert_eq!(store.sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn load_resanitizes_persisted_messages() {
        let mut stored = summary("s1", "One");
        stored.messages = vec![PersistedMessage {
            role: "assistant".into(),
            content: "safe <script>alert(1)</script> text".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            citations: vec!["cite onclick=pwn".into()],
            source_documents: vec![SourceDocument {
                document_name: "doc.pdf".into(),
                document_type: "manual".into(),
                product: "acme".into(),
                source_uri: "s3://docs/doc.pdf".into(),
                score: 0.7,
                content: Some("body javascript:alert(1)".into()),
            }],
        }];
        let api = MockChatStore::new(vec![stored]);
        let store = ChatSessionStore::new(Arc::new(api));
        store.refresh("token").await;

        store.load("s1").await.unwrap();

        let messages = store.messages().await;
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(!message.content.to_lowercase().contains("<script"));
        assert!(!message.citations[0].to_lowercase().contains("onclick="));
        let content = message.source_documents[0].content.as_deref().unwrap();
        assert!(!content.to_lowercase().contains("javascript:"));
        // Metadata fields are left untouched.
        assert_eq!(message.source_documents[0].source_uri, "s3://docs/doc.pdf");
        assert_eq!(store.current_session_id().await, Some("s1".into()));
    }

    #[tokio::test]
    async fn load_replaces_the_log_wholesale() {
        let mut s1 = summary("s1", "One");
        s1.messages = vec![PersistedMessage {
            role: "user".into(),
            content: "from s1".into(),
            timestamp: String::new(),
            citations: Vec::new(),
            source_documents: Vec::new(),
        }];
        let s2 = summary("s2", "Two");
        let api = MockChatStore::new(vec![s1, s2]);
        let store = ChatSessionStore::new(Arc::new(api));
        store.refresh("token").await;

        store.load("s1").await.unwrap();
        assert_eq!(store.messages().await.len(), 1);

        store.load("s2").await.unwrap();
        assert!(store.messages().await.is_empty());
    }

    #[tokio::test]
    async fn load_of_unknown_session_fails() {
        let api = MockChatStore::new(Vec::new());
        let store = ChatSessionStore::new(Arc::new(api));
        assert!(store.load("nope").await.is_err());
    }
}
