//! Keeps the assistant widget eventually consistent with the identity store.
//!
//! The widget re-reads the store on open and on every poll tick. When no
//! identity is stored it either synthesizes a guest session for the role the
//! hosting page implies, or drops to local fallback mode. Both degraded modes
//! are flagged in [`AssistantView::degraded`] and carry a visible badge.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use campus_config::AssistantConfig;
use campus_core::{IdentityRecord, Role};
use campus_identity::{IdentityStore, WriteOutcome};
use serde::Serialize;
use tokio::sync::watch;

use crate::guest;
use crate::inference::{PageContext, PathHeuristic, RoleInference};
use crate::poll::PollHandle;
use crate::portal::Portal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Not evaluated yet.
    Unknown,
    Authenticated,
    /// Synthesized placeholder identity.
    Guest,
    /// Unauthenticated; answers come from the local responder.
    Fallback,
}

impl AuthMode {
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Guest | Self::Fallback)
    }
}

/// What the widget renders. Published on every change through
/// [`Synchronizer::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantView {
    pub mode: AuthMode,
    pub role: Option<Role>,
    pub subject_id: Option<String>,
    /// Set for guest and fallback sessions, never for a real login.
    pub degraded: bool,
    pub badge: String,
    /// One-time message; cleared by [`Synchronizer::take_notice`].
    pub notice: Option<String>,
    /// Portal used for greeting and quick actions.
    pub portal: Role,
    pub suggestions: Vec<String>,
}

impl AssistantView {
    fn unknown(portal: Role) -> Self {
        Self {
            mode: AuthMode::Unknown,
            role: None,
            subject_id: None,
            degraded: false,
            badge: "Checking sign-in".to_string(),
            notice: None,
            portal,
            suggestions: Portal::for_role(portal).quick_action_labels(),
        }
    }

    #[must_use]
    pub const fn uses_local_fallback(&self) -> bool {
        matches!(self.mode, AuthMode::Fallback)
    }
}

/// Result of one [`Synchronizer::evaluate`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub view: AssistantView,
    /// Mode, role or subject differs from the previous pass (always true on
    /// the first pass).
    pub identity_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    mode: AuthMode,
    role: Option<Role>,
    subject_id: Option<String>,
}

impl Observed {
    fn from_record(record: &IdentityRecord) -> Self {
        let guest = record.credential().is_some_and(guest::is_guest_credential);
        Self {
            mode: if guest {
                AuthMode::Guest
            } else {
                AuthMode::Authenticated
            },
            role: record.role,
            subject_id: record.subject_id.clone(),
        }
    }

    const fn fallback() -> Self {
        Self {
            mode: AuthMode::Fallback,
            role: None,
            subject_id: None,
        }
    }
}

#[derive(Debug, Default)]
struct Tracking {
    observed: Option<Observed>,
    last_version: Option<u64>,
    guest_notice_shown: bool,
    /// The backend rejected a guest credential; stop synthesizing new ones
    /// until a real login shows up.
    guest_rejected: bool,
}

pub struct Synchronizer {
    store: Arc<IdentityStore>,
    inference: Arc<dyn RoleInference>,
    page: Mutex<PageContext>,
    guest_sessions: bool,
    default_portal: Role,
    tracking: Mutex<Tracking>,
    view: watch::Sender<AssistantView>,
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("guest_sessions", &self.guest_sessions)
            .field("default_portal", &self.default_portal)
            .field("view", &*self.view.borrow())
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Path/title heuristic, empty page context.
    #[must_use]
    pub fn new(store: Arc<IdentityStore>, config: &AssistantConfig) -> Self {
        let (view, _) = watch::channel(AssistantView::unknown(config.portal));
        Self {
            store,
            inference: Arc::new(PathHeuristic),
            page: Mutex::new(PageContext::default()),
            guest_sessions: config.guest_sessions,
            default_portal: config.portal,
            tracking: Mutex::new(Tracking::default()),
            view,
        }
    }

    #[must_use]
    pub fn with_inference(mut self, inference: impl RoleInference + 'static) -> Self {
        self.inference = Arc::new(inference);
        self
    }

    #[must_use]
    pub fn with_page(self, page: PageContext) -> Self {
        self.set_page(page);
        self
    }

    /// The host navigated. Takes effect on the next evaluation.
    pub fn set_page(&self, page: PageContext) {
        *self.page.lock().unwrap_or_else(PoisonError::into_inner) = page;
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<IdentityStore> {
        &self.store
    }

    #[must_use]
    pub fn view(&self) -> AssistantView {
        self.view.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AssistantView> {
        self.view.subscribe()
    }

    /// Hand the pending one-time notice to the caller and clear it.
    pub fn take_notice(&self) -> Option<String> {
        let mut notice = None;
        self.view.send_if_modified(|view| {
            notice = view.notice.take();
            notice.is_some()
        });
        notice
    }

    /// Replace the suggestion list (e.g. with the backend's role-scoped one).
    pub fn set_suggestions(&self, suggestions: Vec<String>) {
        self.view.send_if_modified(|view| {
            if view.suggestions == suggestions {
                return false;
            }
            view.suggestions = suggestions;
            true
        });
    }

    /// Re-read the store and update the published view.
    ///
    /// Runs on widget open and on every poll tick.
    pub fn evaluate(&self) -> Evaluation {
        let mut tracking = self.lock_tracking();
        let snapshot = self.store.snapshot();
        note_version(&mut tracking, snapshot.version);

        let mut notice = None;
        let observed = if snapshot.is_authenticated() {
            Observed::from_record(&snapshot.record)
        } else {
            self.degrade(&mut tracking, snapshot.version, &mut notice)
        };
        if observed.mode == AuthMode::Authenticated {
            tracking.guest_rejected = false;
        }

        let identity_changed = tracking.observed.as_ref() != Some(&observed);
        if identity_changed {
            self.publish(&mut tracking, observed, notice);
        }
        Evaluation {
            view: self.view(),
            identity_changed,
        }
    }

    /// The backend rejected this surface's credential (401).
    ///
    /// Clears the store if the API client has not already done so and switches
    /// to local fallback without waiting for the next tick.
    pub fn force_unauthenticated(&self) {
        let mut tracking = self.lock_tracking();
        if self.store.read().credential().is_some()
            && let Err(error) = self.store.clear()
        {
            tracing::warn!(%error, "failed to clear identity after rejected credential");
        }
        tracking.last_version = Some(self.store.version());

        let was_guest = tracking
            .observed
            .as_ref()
            .is_some_and(|o| o.mode == AuthMode::Guest);
        if was_guest {
            tracking.guest_rejected = true;
        }

        let notice = if was_guest {
            "The temporary guest session was not accepted by the campus services. \
             I'll keep answering with limited offline responses."
        } else {
            "Your session is no longer valid. I've switched to limited offline answers; \
             sign in again for full help."
        };
        self.publish(&mut tracking, Observed::fallback(), Some(notice.to_string()));
    }

    /// Evaluate now and then every `interval` until the handle is stopped or
    /// dropped.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> PollHandle {
        let this = Arc::clone(self);
        PollHandle::spawn(interval, move || {
            let this = Arc::clone(&this);
            async move {
                this.evaluate();
            }
        })
    }

    fn lock_tracking(&self) -> MutexGuard<'_, Tracking> {
        self.tracking.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// No identity stored: try a guest session, else local fallback.
    fn degrade(
        &self,
        tracking: &mut Tracking,
        read_version: u64,
        notice: &mut Option<String>,
    ) -> Observed {
        if !self.guest_sessions || tracking.guest_rejected {
            return Observed::fallback();
        }
        let page = self
            .page
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(role) = self.inference.infer(&page) else {
            tracing::debug!(path = %page.path, "page implies no role");
            return Observed::fallback();
        };

        let record = match guest::synthesize(role) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(%error, "guest session unavailable");
                return Observed::fallback();
            }
        };

        let written = match self.store.write_if_unchanged(&record, read_version) {
            Ok(WriteOutcome::Written(version)) => {
                tracing::info!(%role, version, "created temporary guest session");
                Some(version)
            }
            Ok(WriteOutcome::Superseded { current }) => {
                tracing::warn!(
                    read_version,
                    current_version = current,
                    "identity changed on another surface before guest session was written; keeping theirs"
                );
                None
            }
            Err(error) => {
                tracing::warn!(%error, "failed to persist guest session");
                return Observed::fallback();
            }
        };

        let confirmed = self.store.snapshot();
        if let Some(version) = written
            && confirmed.version != version
        {
            tracing::warn!(
                written_version = version,
                current_version = confirmed.version,
                "identity changed on another surface right after guest session was written"
            );
        }
        tracking.last_version = Some(confirmed.version);

        if !confirmed.is_authenticated() {
            tracing::warn!("guest session did not persist; using local fallback");
            return Observed::fallback();
        }
        let observed = Observed::from_record(&confirmed.record);
        if written.is_some() && observed.mode == AuthMode::Guest && !tracking.guest_notice_shown {
            tracking.guest_notice_shown = true;
            *notice = Some(format!(
                "You're using a temporary {role} guest session. Answers are general; \
                 sign in for personalised help."
            ));
        }
        observed
    }

    fn publish(&self, tracking: &mut Tracking, observed: Observed, notice: Option<String>) {
        match observed.mode {
            AuthMode::Authenticated => tracing::info!(
                role = ?observed.role,
                subject_id = ?observed.subject_id,
                "assistant identity changed"
            ),
            AuthMode::Guest => tracing::info!(role = ?observed.role, "assistant on guest session"),
            AuthMode::Fallback => {
                tracing::warn!("no usable identity; assistant switched to local fallback mode");
            }
            AuthMode::Unknown => {}
        }

        let portal = observed.role.unwrap_or(self.default_portal);
        let badge = badge(&observed);
        self.view.send_modify(|view| {
            *view = AssistantView {
                mode: observed.mode,
                role: observed.role,
                subject_id: observed.subject_id.clone(),
                degraded: observed.mode.is_degraded(),
                badge,
                notice: notice.or_else(|| view.notice.take()),
                portal,
                suggestions: Portal::for_role(portal).quick_action_labels(),
            };
        });
        tracking.observed = Some(observed);
    }
}

fn note_version(tracking: &mut Tracking, current: u64) {
    if let Some(last) = tracking.last_version {
        if current > last.saturating_add(1) {
            tracing::warn!(
                last_seen_version = last,
                current_version = current,
                "identity changed more than once between polls"
            );
        } else if current < last {
            tracing::debug!(last_seen_version = last, current_version = current, "identity store was reset");
        }
    }
    tracking.last_version = Some(current);
}

fn badge(observed: &Observed) -> String {
    match (observed.mode, observed.role) {
        (AuthMode::Authenticated, Some(role)) => match &observed.subject_id {
            Some(subject) => format!("Signed in as {role} ({subject})"),
            None => format!("Signed in as {role}"),
        },
        (AuthMode::Authenticated, None) => "Signed in".to_string(),
        (AuthMode::Guest, Some(role)) => format!("Guest session ({role}): limited answers"),
        (AuthMode::Guest, None) => "Guest session: limited answers".to_string(),
        (AuthMode::Fallback, _) => "Offline mode: answers are generated locally".to_string(),
        (AuthMode::Unknown, _) => "Checking sign-in".to_string(),
    }
}
