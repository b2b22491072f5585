use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::role::Role;

/// Denormalized display data cached alongside the credential.
///
/// Stored as a flat JSON object. Values are kept as raw JSON so callers can
/// cache whatever their profile endpoint returns (name, email, department).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Profile(pub BTreeMap<String, Value>);

impl Profile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String field lookup, `None` when missing or not a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The four-field session tuple.
///
/// Every field is optional because readers may observe fragments (for
/// diagnostics). A record only counts as a session when
/// [`is_authenticated`](Self::is_authenticated) holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    /// Opaque bearer string issued by the backend. Never parsed for trust.
    pub credential: Option<String>,
    pub role: Option<Role>,
    /// Roll number, employee id, etc.
    pub subject_id: Option<String>,
    pub profile: Option<Profile>,
}

impl IdentityRecord {
    /// A fully-present record without profile data.
    #[must_use]
    pub fn new(credential: impl Into<String>, role: Role, subject_id: impl Into<String>) -> Self {
        Self {
            credential: Some(credential.into()),
            role: Some(role),
            subject_id: Some(subject_id.into()),
            profile: None,
        }
    }

    /// A record carrying only a profile update. Rejected by the store's write
    /// path unless a credential is added.
    #[must_use]
    pub fn profile_only(profile: Profile) -> Self {
        Self {
            profile: Some(profile),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Credential, role and subject id all present and non-empty.
    ///
    /// Profile is deliberately not part of the predicate.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        non_empty(self.credential.as_deref())
            && self.role.is_some()
            && non_empty(self.subject_id.as_deref())
    }

    /// No field is set at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.credential.is_none()
            && self.role.is_none()
            && self.subject_id.is_none()
            && self.profile.is_none()
    }

    /// Credential slot, treating an empty or whitespace-only string as absent.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Point-in-time view of the persisted identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IdentitySnapshot {
    /// Whatever fragments were found, even when incomplete.
    pub record: IdentityRecord,
    /// Write counter stamped by the store on every write and clear.
    pub version: u64,
}

impl IdentitySnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.record.is_authenticated()
    }

    /// The record if it forms a complete session, otherwise `None`.
    #[must_use]
    pub fn into_session(self) -> Option<IdentityRecord> {
        self.record.is_authenticated().then_some(self.record)
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}
