//! The identity store: single owner of the persisted identity fields.
//!
//! All four fields (credential, role, subject id, profile) are written and
//! cleared inside one [`KeyValueStore::update`] call, so a concurrent reader
//! never observes a credential without the role and subject id that were
//! written alongside it.

use std::fmt;
use std::sync::Arc;

use campus_config::{StorageBackend, StorageConfig};
use campus_core::{IdentityRecord, IdentitySnapshot, Profile, Role};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::credential;
use crate::error::StoreError;
use crate::keys;
use crate::kv::{Entries, FileStore, KeyValueStore, MemoryStore};

/// What [`IdentityStore::initialize`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Migration {
    /// Legacy key whose value became the canonical credential.
    pub migrated_from: Option<String>,
    /// Every legacy key that was deleted, in priority order.
    pub removed: Vec<String>,
}

impl Migration {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.migrated_from.is_none() && self.removed.is_empty()
    }
}

/// `Authorization: Bearer <credential>` for outgoing backend requests.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    value: String,
}

impl AuthHeader {
    pub const NAME: &'static str = "Authorization";

    #[must_use]
    pub fn bearer(credential: &str) -> Self {
        Self {
            value: format!("Bearer {credential}"),
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn as_pair(&self) -> (&'static str, &str) {
        (Self::NAME, &self.value)
    }
}

// Keep the credential out of debug output.
impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("value", &credential::redacted_preview(&self.value))
            .finish()
    }
}

/// Status report for support screens and logs. Never contains the full
/// credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDiagnostics {
    pub has_credential: bool,
    pub credential_preview: Option<String>,
    pub structurally_plausible: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub role: Option<Role>,
    pub subject_id: Option<String>,
    pub has_profile: bool,
    pub is_authenticated: bool,
    pub legacy_keys_present: Vec<String>,
    pub version: u64,
}

/// Result of [`IdentityStore::write_if_unchanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Persisted; carries the version stamped by this write.
    Written(u64),
    /// Another writer got there first; nothing was persisted.
    Superseded { current: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// Fields the record leaves out keep their stored value.
    Merge,
    /// Fields the record leaves out are removed.
    Replace,
}

#[derive(Debug, Clone)]
pub struct IdentityStore {
    backend: Arc<dyn KeyValueStore>,
    legacy_keys: Vec<String>,
}

impl IdentityStore {
    /// Wrap a backend using the default legacy key list. Does not migrate;
    /// call [`initialize`](Self::initialize) or use [`open`](Self::open).
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_legacy_keys(backend, keys::DEFAULT_LEGACY_KEYS)
    }

    #[must_use]
    pub fn with_legacy_keys<I, K>(backend: Arc<dyn KeyValueStore>, legacy_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            backend,
            legacy_keys: legacy_keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Wrap a backend and run the legacy migration once.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the migration cannot be persisted.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let store = Self::new(backend);
        store.initialize()?;
        Ok(store)
    }

    /// Build the configured backend and run the legacy migration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if no file location can be resolved or
    /// the migration cannot be persisted.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        let backend: Arc<dyn KeyValueStore> = match config.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => {
                let path = config.resolved_path().ok_or_else(|| {
                    StoreError::Backend(
                        "home directory not found; cannot locate identity file".into(),
                    )
                })?;
                Arc::new(FileStore::new(path))
            }
        };
        let store = Self::with_legacy_keys(backend, config.legacy_keys.iter().cloned());
        store.initialize()?;
        Ok(store)
    }

    #[must_use]
    pub fn legacy_keys(&self) -> &[String] {
        &self.legacy_keys
    }

    /// Migrate a legacy credential into the canonical slot and delete every
    /// legacy key.
    ///
    /// When the canonical credential is already present this only deletes.
    /// Safe to call any number of times.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the backend cannot be updated.
    pub fn initialize(&self) -> Result<Migration, StoreError> {
        let legacy_keys = &self.legacy_keys;
        let mut migration = Migration::default();

        self.backend.update(&mut |entries: &mut Entries| {
            let has_canonical = present(entries, keys::CREDENTIAL).is_some();

            if !has_canonical
                && let Some((key, value)) = legacy_keys
                    .iter()
                    .find_map(|k| present(entries, k).map(|v| (k.clone(), v.to_string())))
            {
                entries.insert(keys::CREDENTIAL.to_string(), value);
                bump_version(entries);
                migration.migrated_from = Some(key);
            }

            for key in legacy_keys {
                if entries.remove(key).is_some() {
                    migration.removed.push(key.clone());
                }
            }
        })?;

        if let Some(from) = &migration.migrated_from {
            tracing::info!(from = %from, to = keys::CREDENTIAL, "migrated legacy credential");
        }
        if !migration.removed.is_empty() {
            tracing::debug!(removed = ?migration.removed, "removed legacy credential keys");
        }
        Ok(migration)
    }

    /// Current persisted record, fragments included.
    ///
    /// Check [`IdentityRecord::is_authenticated`] before treating it as a
    /// session.
    #[must_use]
    pub fn read(&self) -> IdentityRecord {
        self.snapshot().record
    }

    /// Current persisted record plus the write version it was read at.
    ///
    /// Backend read failures are logged and reported as an empty record.
    #[must_use]
    pub fn snapshot(&self) -> IdentitySnapshot {
        let entries = match self.backend.load() {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(%error, "identity backend unreadable; treating identity as absent");
                return IdentitySnapshot::default();
            }
        };

        IdentitySnapshot {
            record: IdentityRecord {
                credential: present(&entries, keys::CREDENTIAL).map(str::to_string),
                role: parse_role(&entries),
                subject_id: present(&entries, keys::SUBJECT_ID).map(str::to_string),
                profile: parse_profile(&entries),
            },
            version: parse_version(&entries),
        }
    }

    /// Persist every field the record carries; absent fields are untouched.
    ///
    /// Returns the version stamped by this write.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MissingCredential` (nothing persisted) when the
    /// record has no credential, or `StoreError::Backend` on I/O failure.
    pub fn write(&self, record: &IdentityRecord) -> Result<u64, StoreError> {
        match self.write_guarded(record, None, WriteMode::Merge)? {
            WriteOutcome::Written(version) | WriteOutcome::Superseded { current: version } => {
                Ok(version)
            }
        }
    }

    /// Persist `record` as the whole identity: role, subject id and profile
    /// the record leaves out are removed, not inherited from the previous
    /// session.
    ///
    /// Returns the version stamped by this write.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn replace(&self, record: &IdentityRecord) -> Result<u64, StoreError> {
        match self.write_guarded(record, None, WriteMode::Replace)? {
            WriteOutcome::Written(version) | WriteOutcome::Superseded { current: version } => {
                Ok(version)
            }
        }
    }

    /// Like [`replace`](Self::replace), but only if the store is still at
    /// `expected` version. Used by writers that must never overwrite an
    /// identity persisted by another surface after they last looked.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn write_if_unchanged(
        &self,
        record: &IdentityRecord,
        expected: u64,
    ) -> Result<WriteOutcome, StoreError> {
        self.write_guarded(record, Some(expected), WriteMode::Replace)
    }

    fn write_guarded(
        &self,
        record: &IdentityRecord,
        expected: Option<u64>,
        mode: WriteMode,
    ) -> Result<WriteOutcome, StoreError> {
        let Some(token) = record.credential() else {
            tracing::warn!("identity write rejected: empty credential");
            return Err(StoreError::MissingCredential);
        };

        let profile = record
            .profile
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Serialize {
                field: "profile",
                reason: e.to_string(),
            })?;
        let subject_id = record
            .subject_id
            .as_deref()
            .filter(|s| !s.trim().is_empty());
        let written_at = Utc::now().timestamp_millis().to_string();

        let mut outcome = WriteOutcome::Written(0);
        self.backend.update(&mut |entries: &mut Entries| {
            let current = parse_version(entries);
            if expected.is_some_and(|v| v != current) {
                outcome = WriteOutcome::Superseded { current };
                return;
            }
            if mode == WriteMode::Replace {
                for key in keys::IDENTITY_FIELDS {
                    entries.remove(key);
                }
            }
            entries.insert(keys::CREDENTIAL.to_string(), token.to_string());
            entries.insert(keys::CREDENTIAL_WRITTEN_AT.to_string(), written_at.clone());
            if let Some(role) = record.role {
                entries.insert(keys::ROLE.to_string(), role.as_str().to_string());
            }
            if let Some(subject_id) = subject_id {
                entries.insert(keys::SUBJECT_ID.to_string(), subject_id.to_string());
            }
            if let Some(profile) = &profile {
                entries.insert(keys::PROFILE.to_string(), profile.clone());
            }
            outcome = WriteOutcome::Written(bump_version(entries));
        })?;

        match outcome {
            WriteOutcome::Written(version) => tracing::debug!(
                credential = %credential::redacted_preview(token),
                role = ?record.role,
                subject_id = ?subject_id,
                version,
                "identity written"
            ),
            WriteOutcome::Superseded { current } => tracing::debug!(
                expected = ?expected,
                current,
                "identity write skipped; store changed since last read"
            ),
        }
        Ok(outcome)
    }

    /// Delete all four canonical fields and every legacy key in one pass.
    ///
    /// Returns the version stamped by this clear.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the backend cannot be updated.
    pub fn clear(&self) -> Result<u64, StoreError> {
        let legacy_keys = &self.legacy_keys;
        let mut version = 0;
        self.backend.update(&mut |entries: &mut Entries| {
            for key in keys::IDENTITY_FIELDS {
                entries.remove(key);
            }
            entries.remove(keys::CREDENTIAL_WRITTEN_AT);
            for key in legacy_keys {
                entries.remove(key);
            }
            version = bump_version(entries);
        })?;
        tracing::info!(version, "identity cleared");
        Ok(version)
    }

    /// Credential, role and subject id all present. Profile is not required.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    /// Bearer header for the stored credential, `None` iff no credential.
    #[must_use]
    pub fn auth_header(&self) -> Option<AuthHeader> {
        self.read().credential().map(AuthHeader::bearer)
    }

    /// Shape check used for diagnostics only. See
    /// [`credential::structurally_plausible`].
    #[must_use]
    pub fn structurally_plausible(credential: &str) -> bool {
        credential::structurally_plausible(credential)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.backend
            .load()
            .map(|entries| parse_version(&entries))
            .unwrap_or_default()
    }

    /// When the current credential was written, if recorded.
    #[must_use]
    pub fn credential_written_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.backend.get(keys::CREDENTIAL_WRITTEN_AT).ok()??;
        raw.parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Whether the stored credential is older than `max_age`.
    ///
    /// No credential counts as stale; a credential without a recorded write
    /// time (e.g. migrated from a legacy key) does not. Diagnostic only.
    #[must_use]
    pub fn is_credential_stale(&self, max_age: TimeDelta) -> bool {
        if self.read().credential().is_none() {
            return true;
        }
        self.credential_written_at()
            .is_some_and(|written_at| Utc::now() - written_at > max_age)
    }

    /// Legacy keys that still hold a value.
    #[must_use]
    pub fn legacy_keys_present(&self) -> Vec<String> {
        let Ok(entries) = self.backend.load() else {
            return Vec::new();
        };
        self.legacy_keys
            .iter()
            .filter(|k| present(&entries, k).is_some())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn diagnostics(&self) -> IdentityDiagnostics {
        let snapshot = self.snapshot();
        let token = snapshot.record.credential();
        IdentityDiagnostics {
            has_credential: token.is_some(),
            credential_preview: token.map(credential::redacted_preview),
            structurally_plausible: token.is_some_and(credential::structurally_plausible),
            expires_at: token.and_then(|c| credential::decode_expiry(c).ok()),
            role: snapshot.record.role,
            subject_id: snapshot.record.subject_id.clone(),
            has_profile: snapshot.record.profile.is_some(),
            is_authenticated: snapshot.is_authenticated(),
            legacy_keys_present: self.legacy_keys_present(),
            version: snapshot.version,
        }
    }
}

fn present<'a>(entries: &'a Entries, key: &str) -> Option<&'a str> {
    entries
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn parse_role(entries: &Entries) -> Option<Role> {
    let raw = present(entries, keys::ROLE)?;
    match raw.parse::<Role>() {
        Ok(role) => Some(role),
        Err(error) => {
            tracing::warn!(%error, "ignoring unrecognized persisted role");
            None
        }
    }
}

fn parse_profile(entries: &Entries) -> Option<Profile> {
    let raw = present(entries, keys::PROFILE)?;
    match serde_json::from_str::<Profile>(raw) {
        Ok(profile) => Some(profile),
        Err(error) => {
            tracing::warn!(%error, "stored profile is malformed; treating it as absent");
            None
        }
    }
}

fn parse_version(entries: &Entries) -> u64 {
    entries
        .get(keys::VERSION)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn bump_version(entries: &mut Entries) -> u64 {
    let next = parse_version(entries).saturating_add(1);
    entries.insert(keys::VERSION.to_string(), next.to_string());
    next
}
