//! # campus-identity
//!
//! Client-side session layer for the campus app.
//!
//! - [`IdentityStore`]: persisted credential/role/subject/profile, legacy key
//!   migration, bearer header construction
//! - [`SessionContext`]: reactive application-wide session state on top of the store
//! - [`ApiClient`]: authorized backend calls; a 401 clears the store
//!
//! The credential is opaque. Nothing here issues, signs or verifies tokens.

pub mod api;
pub mod credential;
pub mod error;
pub mod keys;
pub mod kv;
pub mod session;
pub mod store;

pub use api::ApiClient;
pub use error::{ApiError, SessionError, StoreError};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use session::{LoginRequest, SessionContext, SessionState, ShellOutcome};
pub use store::{AuthHeader, IdentityDiagnostics, IdentityStore, Migration, WriteOutcome};
