//! Temporary guest identities.
//!
//! A guest credential is a local placeholder, `guest:<role>:<unix_ms>:<nonce>`.
//! It has no dots, so it never looks like a signed token, and the backend is
//! expected to reject it.

use campus_core::{IdentityRecord, Profile, Role};
use chrono::Utc;

use crate::error::AssistantError;

pub const CREDENTIAL_PREFIX: &str = "guest:";

#[must_use]
pub fn is_guest_credential(credential: &str) -> bool {
    credential.starts_with(CREDENTIAL_PREFIX)
}

#[must_use]
pub const fn subject_id(role: Role) -> &'static str {
    match role {
        Role::Student => "GUEST-STUDENT",
        Role::Faculty => "GUEST-FACULTY",
        Role::Admin => "GUEST-ADMIN",
    }
}

/// Fresh guest credential for `role`.
///
/// # Errors
///
/// Returns `AssistantError::Entropy` if the OS random source fails.
pub fn credential(role: Role) -> Result<String, AssistantError> {
    let mut nonce = [0u8; 8];
    getrandom::fill(&mut nonce).map_err(|e| AssistantError::Entropy(e.to_string()))?;
    let hex: String = nonce.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!(
        "{CREDENTIAL_PREFIX}{role}:{}:{hex}",
        Utc::now().timestamp_millis()
    ))
}

/// Complete guest record: credential, role, subject id and a placeholder
/// profile marked `guest: true`.
///
/// # Errors
///
/// See [`credential`].
pub fn synthesize(role: Role) -> Result<IdentityRecord, AssistantError> {
    let name = match role {
        Role::Student => "Guest Student",
        Role::Faculty => "Guest Faculty",
        Role::Admin => "Guest Administrator",
    };
    let profile = Profile::new()
        .with("name", name)
        .with("role", role.as_str())
        .with("guest", true);
    Ok(IdentityRecord::new(credential(role)?, role, subject_id(role)).with_profile(profile))
}
