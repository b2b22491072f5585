use serde::Serialize;

/// One assistant answer as shown in the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub content: String,
    pub suggestions: Vec<String>,
    /// Answered locally, without the backend. Always shown with a label.
    pub reduced_capability: bool,
    /// Backend asked the host to navigate (e.g. `attendance`).
    pub navigation: Option<String>,
}

impl Reply {
    #[must_use]
    pub fn local(content: impl Into<String>, suggestions: &[&str]) -> Self {
        Self {
            content: content.into(),
            suggestions: suggestions.iter().map(|s| (*s).to_string()).collect(),
            reduced_capability: true,
            navigation: None,
        }
    }
}
