//! reqwest implementations of the four collaborator service traits.
//!
//! Each client owns its own `reqwest::Client` and base URL and applies
//! a per-request timeout appropriate to its operation class. Transport
//! failures convert into the shared `ServiceError` taxonomy via
//! `From<reqwest::Error>`; no reqwest error leaves this crate.

pub mod auth;
pub mod chat;
pub mod file_access;
pub mod retrieval;

pub use auth::AuthClient;
pub use chat::ChatStoreClient;
pub use file_access::FileAccessClient;
pub use retrieval::RetrievalClient;
