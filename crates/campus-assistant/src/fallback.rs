//! Local fallback responder: canned, keyword-matched replies computed in
//! memory. Never calls the backend and never returns account data.

use crate::portal::Portal;
use crate::reply::Reply;

#[derive(Debug, Clone, Copy)]
pub struct LocalResponder {
    portal: &'static Portal,
}

impl LocalResponder {
    #[must_use]
    pub const fn new(portal: &'static Portal) -> Self {
        Self { portal }
    }

    #[must_use]
    pub const fn portal(&self) -> &'static Portal {
        self.portal
    }

    #[must_use]
    pub fn reply(&self, message: &str) -> Reply {
        let text = message.to_lowercase();
        let has_word = |needle: &str| {
            text.split(|c: char| !c.is_alphanumeric())
                .any(|word| word == needle)
        };

        if ["hello", "hi", "hey"].into_iter().any(has_word) {
            return Reply::local(
                format!(
                    "Hello! I'm your {}. I need to connect to the campus services to give you \
                     real-time information. Please make sure you're signed in and connected.",
                    self.portal.name
                ),
                &["Contact support if you need help"],
            );
        }

        if text.contains("help") || text.contains("support") {
            return Reply::local(
                format!(
                    "I can help you with {} portal tasks, but I need to be connected to the \
                     campus services first. Please check your connection or contact support.",
                    self.portal.role
                ),
                &["Contact support", "Check connection"],
            );
        }

        if text.contains("thank you") || text.contains("thanks") {
            return Reply::local(
                "You're welcome! Please note that I need to be connected to the campus \
                 services to provide specific information.",
                &["Contact support"],
            );
        }

        Reply::local(
            format!(
                "I'm unable to process \"{}\" without connecting to the campus services. \
                 Please make sure you're signed in and the system is available, or contact \
                 support for assistance.",
                message.trim()
            ),
            &["Contact support", "Try again later"],
        )
    }
}
