//! The assistant widget: synchronizer + chat backend + local responder.
//!
//! Only a real login talks to the chat endpoint. A guest session may fetch
//! role-scoped suggestions and nothing else; fallback mode never calls the
//! backend. A 401 from either call drops the widget to fallback at once.

use std::sync::Arc;
use std::time::Duration;

use campus_config::CampusConfig;
use campus_core::Role;
use campus_identity::{ApiClient, ApiError, IdentityStore};

use crate::backend::{ChatBackend, HttpChatBackend};
use crate::error::AssistantError;
use crate::fallback::LocalResponder;
use crate::inference::PageContext;
use crate::poll::PollHandle;
use crate::portal::Portal;
use crate::reply::Reply;
use crate::sync::{AssistantView, AuthMode, Synchronizer};

const CONNECTIVITY_MESSAGE: &str = "Sorry, I'm unable to connect to the campus services right \
    now. Please check your connection and try again, or contact support if the issue persists.";

#[derive(Debug)]
pub struct Assistant<B> {
    sync: Arc<Synchronizer>,
    backend: B,
    poll_interval: Duration,
}

impl Assistant<HttpChatBackend> {
    /// Open the configured identity store and point the chat backend at
    /// `api.base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::Store` if the store cannot be opened or
    /// `AssistantError::Api` if the HTTP client cannot be built.
    pub fn from_config(config: &CampusConfig, page: PageContext) -> Result<Self, AssistantError> {
        let store = Arc::new(IdentityStore::from_config(&config.storage)?);
        let client = ApiClient::new(config.api.clone(), Arc::clone(&store))?;
        let sync = Synchronizer::new(store, &config.assistant).with_page(page);
        Ok(Self::new(
            sync,
            HttpChatBackend::new(client),
            config.assistant.poll_interval(),
        ))
    }
}

impl<B: ChatBackend> Assistant<B> {
    #[must_use]
    pub fn new(sync: Synchronizer, backend: B, poll_interval: Duration) -> Self {
        Self {
            sync: Arc::new(sync),
            backend,
            poll_interval,
        }
    }

    #[must_use]
    pub const fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.sync
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn view(&self) -> AssistantView {
        self.sync.view()
    }

    /// Widget opened: evaluate immediately.
    pub async fn open(&self) -> AssistantView {
        self.tick().await;
        self.sync.view()
    }

    /// One synchronizer pass; on an identity change, refresh the suggestion
    /// list from the backend.
    pub async fn tick(&self) {
        let eval = self.sync.evaluate();
        if eval.identity_changed
            && matches!(eval.view.mode, AuthMode::Authenticated | AuthMode::Guest)
        {
            self.refresh_suggestions(eval.view.portal).await;
        }
    }

    /// Portal greeting with its quick actions.
    #[must_use]
    pub fn greeting(&self) -> Reply {
        let view = self.sync.view();
        let portal = Portal::for_role(view.portal);
        Reply {
            content: portal.greeting.to_string(),
            suggestions: view.suggestions,
            reduced_capability: view.degraded,
            navigation: None,
        }
    }

    pub async fn ask(&self, message: &str) -> Reply {
        let mut view = self.sync.view();
        if view.mode == AuthMode::Unknown {
            self.tick().await;
            view = self.sync.view();
        }
        let portal = Portal::for_role(view.portal);
        if view.mode != AuthMode::Authenticated {
            return LocalResponder::new(portal).reply(message);
        }

        match self.backend.chat(message, view.portal).await {
            Ok(answer) => Reply {
                suggestions: portal.suggestions_for_response(&answer.response),
                navigation: answer.navigation_type.filter(|_| answer.is_navigation),
                content: answer.response,
                reduced_capability: false,
            },
            Err(ApiError::Unauthorized) => {
                self.sync.force_unauthenticated();
                let mut reply = LocalResponder::new(portal).reply(message);
                reply.content = format!(
                    "Your session has expired, so I'm answering in offline mode. {}",
                    reply.content
                );
                reply
            }
            Err(ApiError::Forbidden(reason)) => Reply {
                content: format!("You don't have permission to access that. {reason}"),
                suggestions: vec!["Contact support".to_string()],
                reduced_capability: false,
                navigation: None,
            },
            Err(error) => {
                tracing::warn!(%error, "chat request failed");
                Reply {
                    content: CONNECTIVITY_MESSAGE.to_string(),
                    suggestions: vec!["Contact support".to_string(), "Try again later".to_string()],
                    reduced_capability: false,
                    navigation: None,
                }
            }
        }
    }

    async fn refresh_suggestions(&self, portal: Role) {
        match self.backend.suggestions(portal).await {
            Ok(suggestions) if !suggestions.is_empty() => self.sync.set_suggestions(suggestions),
            Ok(_) => {}
            Err(ApiError::Unauthorized) => self.sync.force_unauthenticated(),
            Err(error) => tracing::debug!(%error, "keeping built-in suggestions"),
        }
    }
}

impl<B: ChatBackend + 'static> Assistant<B> {
    /// Poll the identity store at the configured interval; the first tick
    /// runs immediately.
    pub fn start_polling(self: &Arc<Self>) -> PollHandle {
        let this = Arc::clone(self);
        PollHandle::spawn(self.poll_interval, move || {
            let this = Arc::clone(&this);
            async move { this.tick().await }
        })
    }
}
