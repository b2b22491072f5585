use thiserror::Error;

/// Failures of the persisted key-value layer.
///
/// Absence of identity is not an error and never produces one of these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refusing to persist identity without a credential")]
    MissingCredential,

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("cannot inspect credential: {0}")]
    Inspect(String),

    #[error("failed to serialize {field}: {reason}")]
    Serialize { field: &'static str, reason: String },
}

/// Failures of the session context's mutators.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("login rejected: credential is empty or missing")]
    MissingCredential,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a backend call that did not succeed.
///
/// Status mapping: 401 clears identity, 403 leaves it untouched, transport
/// failures leave it untouched and may be retried.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authorization rejected by backend (HTTP 401)")]
    Unauthorized,

    #[error("insufficient permission (HTTP 403): {0}")]
    Forbidden(String),

    #[error("could not reach backend: {0}")]
    Network(String),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether this failure means the stored credential is no longer valid.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
