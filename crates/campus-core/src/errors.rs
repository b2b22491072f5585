//! Cross-cutting error types.
//!
//! Crate-specific failures (store backends, HTTP, config) live in their own
//! crates. Absence of identity is never represented here: it is a valid state.

use thiserror::Error;

/// Errors that can be raised by any campus crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A role string did not name a known role.
    #[error("Unknown role: '{0}' (expected student, faculty or admin)")]
    UnknownRole(String),

    /// Data failed validation (shape, emptiness).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
