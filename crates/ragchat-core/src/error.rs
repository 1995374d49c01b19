//! Error types shared across the orchestration layer.

use thiserror::Error;

/// A shared error type for every service boundary in the client.
///
/// All transport and HTTP failures are converted into one of these
/// variants at the client layer; no raw `reqwest::Error` crosses into
/// the orchestration or display layers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request did not complete within its deadline.
    #[error("request timed out")]
    Timeout,

    /// The remote host could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// TLS negotiation or certificate validation failed.
    #[error("TLS failure: {0}")]
    Tls(String),

    /// The supplied identifier/secret pair was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account is temporarily locked by the auth service.
    #[error("account locked")]
    AccountLocked,

    /// The bearer token was rejected for a reason other than expiry.
    #[error("authentication is invalid")]
    AuthInvalid,

    /// The bearer token has expired and the user must re-authenticate.
    #[error("authentication expired")]
    AuthExpired,

    /// The authenticated user is not allowed to perform the operation.
    #[error("access denied")]
    Forbidden,

    /// The service is rate-limiting this client.
    #[error("rate limited")]
    RateLimited,

    /// Any other non-success HTTP status.
    #[error("server error (status {status})")]
    Server { status: u16 },

    /// Local input validation failed; no network call was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// A required collaborator endpoint is not configured.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Anything that does not fit the taxonomy above.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ServiceError {
    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a NotConfigured error.
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured(message.into())
    }

    /// Creates an Unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Returns true when the bearer token must be discarded and the
    /// user sent back to the unauthenticated state.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthInvalid | Self::AuthExpired)
    }

    /// Returns true for transport-level failures (no HTTP status).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_) | Self::Tls(_))
    }

    /// One human-readable message per error kind, suitable for the
    /// display layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Timeout => "The request timed out. Please try again.",
            Self::Connection(_) => "Could not reach the server. Check your network connection.",
            Self::Tls(_) => "A secure connection could not be established.",
            Self::InvalidCredentials => "The email address or password is incorrect.",
            Self::AccountLocked => "This account is locked. Please wait before retrying.",
            Self::AuthInvalid => "Your session is invalid. Please log in again.",
            Self::AuthExpired => "Your session has expired. Please log in again.",
            Self::Forbidden => "You do not have permission to perform this action.",
            Self::RateLimited => "Too many requests. Please wait a moment and retry.",
            Self::Server { .. } => "The server reported an error. Please try again later.",
            Self::Validation(_) => "The input is not valid.",
            Self::NotConfigured(_) => "This feature is not configured.",
            Self::Unexpected(_) => "An unexpected error occurred.",
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if is_tls_failure(&err) {
            return Self::Tls(err.to_string());
        }
        if err.is_connect() {
            return Self::Connection(err.to_string());
        }
        Self::Unexpected(err.to_string())
    }
}

/// Walks the error source chain looking for TLS/certificate causes.
///
/// reqwest does not expose a dedicated predicate for TLS failures, so
/// this inspects the rendered messages of the chain.
fn is_tls_failure(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        let message = current.to_string().to_lowercase();
        if message.contains("tls") || message.contains("ssl") || message.contains("certificate") {
            return true;
        }
        source = current.source();
    }
    false
}

/// A type alias for `Result<T, ServiceError>`.
pub type Result<T> = std::result::Result<T, ServiceError>;
