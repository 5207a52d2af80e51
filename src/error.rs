/// Failures surfaced by the SDK.
///
/// The taxonomy mirrors how callers recover: transport and decode
/// failures are generic, session expiry is handled globally by the
/// gateway before this value reaches the caller, and domain conflicts
/// carry the backend's message for inline display.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport failure: connect, TLS, timeout, or body read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected envelope or payload.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend rejected the current credentials mid-use.
    ///
    /// By the time a caller sees this, the gateway has already logged
    /// the session out and raised
    /// [`SessionEvents::session_expired`](crate::session::SessionEvents::session_expired).
    #[error("session expired")]
    SessionExpired,

    /// Login or signup was rejected for bad credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The signed-in account is not allowed to perform the action.
    #[error("not permitted: {message}")]
    Forbidden { message: String },

    /// The requested resource does not exist.
    #[error("not found")]
    NotFound,

    /// Domain conflict: coupon sold out or already claimed, duplicate
    /// signup email.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Any other non-2xx response, with the envelope's report when it
    /// could be parsed.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Input rejected locally before dispatch.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Durable session storage failed to read or write.
    #[error("session storage error: {0}")]
    Storage(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures worth retrying as-is (transport only; every
    /// other variant needs a changed request or a new session).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}
