use campus_identity::{ApiError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("cannot generate guest credential: {0}")]
    Entropy(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("chat backend reported failure: {0}")]
    Backend(String),
}
