//! Core domain types for the RAG chat orchestration layer.
//!
//! This crate holds the pieces every other layer agrees on: the error
//! taxonomy, the sanitizer, filter and message types, session
//! summaries, endpoint configuration, and the traits the four HTTP
//! collaborators are consumed through.

pub mod config;
pub mod error;
pub mod filters;
pub mod message;
pub mod sanitize;
pub mod service;
pub mod session;

pub use config::{Endpoints, USER_AGENT};
pub use error::{Result, ServiceError};
pub use filters::{FilterKey, FilterSet};
pub use message::{ChatMessage, MessageRole, SourceDocument};
pub use sanitize::{MAX_TEXT_CHARS, sanitize};
pub use service::{
    AuthApi, ChatStoreApi, FileAccessApi, QueryRequest, QueryResponse, RetrievalApi,
};
pub use session::{NEW_CHAT_TITLE, PersistedMessage, SessionSummary, UNTITLED_CHAT};
