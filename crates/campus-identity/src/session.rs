//! Application-wide session state.
//!
//! ```text
//! Initializing ──mount──▶ Authenticated
//!                    └──▶ Unauthenticated
//! ```
//!
//! The context reads the store once, at mount, and afterwards only changes
//! through [`SessionContext::login`] and [`SessionContext::logout`]. It does
//! not poll; surfaces that need to notice other tabs use the assistant's
//! synchronizer. Subscribers receive every transition through a
//! `tokio::sync::watch` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use campus_config::SessionConfig;
use campus_core::{IdentityRecord, Role};
use chrono::TimeDelta;
use tokio::sync::watch;

use crate::error::{ApiError, SessionError};
use crate::store::IdentityStore;

/// What the UI tree renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Before [`SessionContext::mount`] has read the store.
    Initializing,
    Authenticated {
        record: IdentityRecord,
        /// Set when the role-only compatibility login produced this state;
        /// nothing was persisted.
        legacy_shim: bool,
    },
    Unauthenticated,
}

impl SessionState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub const fn record(&self) -> Option<&IdentityRecord> {
        match self {
            Self::Authenticated { record, .. } => Some(record),
            Self::Initializing | Self::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.record().and_then(|r| r.role)
    }
}

/// Call shapes accepted by [`SessionContext::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginRequest {
    /// A full record from the login endpoint.
    Full(IdentityRecord),
    /// Older call sites pass only a role. Kept for compatibility; never
    /// reaches the store.
    LegacyRole(Role),
}

impl From<IdentityRecord> for LoginRequest {
    fn from(record: IdentityRecord) -> Self {
        Self::Full(record)
    }
}

impl From<Role> for LoginRequest {
    fn from(role: Role) -> Self {
        Self::LegacyRole(role)
    }
}

/// What the main shell should do after a backend call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutcome {
    /// Identity was cleared; navigate to the login surface.
    RedirectToLogin,
    /// Show a permission message; identity is untouched.
    PermissionDenied(String),
    /// Show a connectivity message; the caller may retry.
    Connectivity(String),
    /// Anything else, shown verbatim.
    Failed(String),
}

#[derive(Debug)]
pub struct SessionContext {
    store: Arc<IdentityStore>,
    state: watch::Sender<SessionState>,
    /// Store version this context last read or wrote.
    seen_version: AtomicU64,
    max_age: TimeDelta,
}

impl SessionContext {
    #[must_use]
    pub fn new(store: Arc<IdentityStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            store,
            state,
            seen_version: AtomicU64::new(0),
            max_age: max_age(&SessionConfig::default()),
        }
    }

    /// Use the configured credential age limit for the staleness warning at
    /// mount.
    #[must_use]
    pub fn with_config(mut self, config: &SessionConfig) -> Self {
        self.max_age = max_age(config);
        self
    }

    /// Read the persisted identity once and leave `Initializing`.
    ///
    /// Calling it again after the first mount is a no-op that returns the
    /// current state.
    pub fn mount(&self) -> SessionState {
        if !matches!(*self.state.borrow(), SessionState::Initializing) {
            tracing::debug!("session context already mounted");
            return self.state();
        }

        let snapshot = self.store.snapshot();
        self.seen_version.store(snapshot.version, Ordering::SeqCst);
        let next = match snapshot.into_session() {
            Some(record) => {
                tracing::info!(role = ?record.role, "restored persisted session");
                if self.store.is_credential_stale(self.max_age) {
                    tracing::warn!(
                        max_age_days = self.max_age.num_days(),
                        "restored credential is older than the configured limit; \
                         the backend decides whether it is still accepted"
                    );
                }
                SessionState::Authenticated {
                    record,
                    legacy_shim: false,
                }
            }
            None => {
                tracing::info!("no persisted session found");
                SessionState::Unauthenticated
            }
        };
        self.state.send_replace(next.clone());
        next
    }

    /// Record a login and persist it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingCredential` (state unchanged) for a full
    /// record without a credential, or `SessionError::Store` if persisting
    /// fails.
    pub fn login(&self, request: impl Into<LoginRequest>) -> Result<(), SessionError> {
        match request.into() {
            LoginRequest::Full(record) => self.login_full(record),
            LoginRequest::LegacyRole(role) => {
                self.login_legacy(role);
                Ok(())
            }
        }
    }

    fn login_full(&self, record: IdentityRecord) -> Result<(), SessionError> {
        if record.credential().is_none() {
            tracing::warn!("login rejected: empty credential");
            return Err(SessionError::MissingCredential);
        }

        self.note_external_change("login");
        let version = self.store.replace(&record)?;
        self.seen_version.store(version, Ordering::SeqCst);

        tracing::info!(role = ?record.role, "user logged in");
        self.state.send_replace(SessionState::Authenticated {
            record,
            legacy_shim: false,
        });
        Ok(())
    }

    fn login_legacy(&self, role: Role) {
        if let Some(persisted) = self.store.snapshot().into_session() {
            tracing::warn!(
                requested = %role,
                persisted = ?persisted.role,
                "role-only login ignored: a full session is already persisted"
            );
            self.state.send_replace(SessionState::Authenticated {
                record: persisted,
                legacy_shim: false,
            });
            return;
        }

        tracing::warn!(%role, "role-only login; session is in-memory only");
        self.state.send_replace(SessionState::Authenticated {
            record: IdentityRecord {
                role: Some(role),
                ..IdentityRecord::default()
            },
            legacy_shim: true,
        });
    }

    /// Clear the store and drop to `Unauthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the store cannot be cleared; the
    /// in-memory state still becomes `Unauthenticated`.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.note_external_change("logout");
        let cleared = self.store.clear();
        self.state.send_replace(SessionState::Unauthenticated);
        let version = cleared?;
        self.seen_version.store(version, Ordering::SeqCst);
        tracing::info!("user logged out");
        Ok(())
    }

    /// Delegates to the store; `false` while initializing.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        if self.is_initializing() {
            return false;
        }
        self.store.is_authenticated()
    }

    /// Delegates to the store; `None` while initializing or when no complete
    /// session is persisted.
    #[must_use]
    pub fn current_identity(&self) -> Option<IdentityRecord> {
        if self.is_initializing() {
            return None;
        }
        self.store.snapshot().into_session()
    }

    /// The in-memory state the UI renders from.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<IdentityStore> {
        &self.store
    }

    /// Translate a failed backend call into what the shell should do.
    ///
    /// A 401 logs the user out here even if the API client already cleared
    /// the store, so the in-memory state follows.
    pub fn handle_api_error(&self, error: &ApiError) -> ShellOutcome {
        match error {
            ApiError::Unauthorized => {
                if let Err(err) = self.logout() {
                    tracing::warn!(error = %err, "logout after 401 did not fully complete");
                }
                ShellOutcome::RedirectToLogin
            }
            ApiError::Forbidden(message) => ShellOutcome::PermissionDenied(message.clone()),
            ApiError::Network(message) => ShellOutcome::Connectivity(format!(
                "Unable to reach the server. Check your connection and try again. ({message})"
            )),
            ApiError::Status { .. } | ApiError::Decode(_) => ShellOutcome::Failed(error.to_string()),
        }
    }

    fn is_initializing(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Initializing)
    }

    /// Log when another surface wrote the store since this context last
    /// looked. The pending write still wins.
    fn note_external_change(&self, operation: &'static str) {
        let seen = self.seen_version.load(Ordering::SeqCst);
        let current = self.store.version();
        if current != seen {
            tracing::warn!(
                operation,
                seen_version = seen,
                current_version = current,
                "identity changed on another surface; overwriting (last writer wins)"
            );
        }
    }
}

fn max_age(config: &SessionConfig) -> TimeDelta {
    TimeDelta::days(i64::from(config.credential_max_age_days))
}
