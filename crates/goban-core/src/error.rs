use thiserror::Error;

/// Failure of a call against the content platform.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network, HTTP status, or decoding failure. Worth retrying.
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform answered with a non-zero application code.
    #[error("platform rejected request (code={code}): {message}")]
    PeerRejected { code: i64, message: String },

    /// The credential was refused; the account has to log in again.
    #[error("credential expired or invalid")]
    InvalidCredential,

    /// The credential carries no `bili_jct` token, so write calls cannot be signed.
    #[error("csrf token (bili_jct) missing from credential")]
    MissingCsrfToken,

    /// Every attempt allowed by the retry policy failed.
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<RemoteError>,
    },
}

impl RemoteError {
    /// Only transport failures are retried; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Top-level error type for Goban.
#[derive(Debug, Error)]
pub enum GobanError {
    /// Error from the content platform.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Login flow error with a user-facing reason.
    #[error("login error: {0}")]
    Login(String),

    /// A session, task, or account does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
