//! Application-level orchestration for the RAG chat client.
//!
//! This crate ties the service clients together: the authenticated
//! session lifecycle, the chat session store, the query pipeline and
//! the file-URL cache, all reachable through [`ChatContext`].

pub mod auth_manager;
pub mod context;
pub mod file_cache;
pub mod orchestrator;
pub mod session_store;

pub use auth_manager::{AuthSession, AuthSessionManager};
pub use context::ChatContext;
pub use file_cache::{FILE_URL_TTL, FileUrlCache};
pub use orchestrator::{NewSession, QueryOutcome, RetrievalOrchestrator};
pub use session_store::{ChatSessionStore, Conversation};
