//! # campus-core
//!
//! Core types shared by every campus crate.
//!
//! - [`Role`]: the closed set of principals the application knows about
//! - [`IdentityRecord`]: the four-field session tuple persisted by the identity store
//! - [`Profile`]: denormalized display data cached next to the credential
//! - [`IdentitySnapshot`]: what a reader gets back, including the completeness verdict
//! - Cross-cutting error types

pub mod errors;
pub mod identity;
pub mod role;

pub use errors::CoreError;
pub use identity::{IdentityRecord, IdentitySnapshot, Profile};
pub use role::Role;
