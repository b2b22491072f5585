//! Best-effort role inference from the hosting page.
//!
//! The signal is non-authoritative: it only decides which guest portal to
//! synthesize when no real identity is stored. Anything implementing
//! [`RoleInference`] can replace [`PathHeuristic`], including a plain closure.

use campus_core::Role;

/// Where the assistant widget is mounted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub path: String,
    pub title: String,
}

impl PageContext {
    #[must_use]
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
        }
    }
}

pub trait RoleInference: Send + Sync {
    /// The role the page implies, or `None` when it implies none (or several).
    fn infer(&self, page: &PageContext) -> Option<Role>;
}

impl<F> RoleInference for F
where
    F: Fn(&PageContext) -> Option<Role> + Send + Sync,
{
    fn infer(&self, page: &PageContext) -> Option<Role> {
        self(page)
    }
}

/// Matches role names in the URL path first, then in the page title.
///
/// Path segments are percent-decoded and lowercased; a segment matches a
/// role when it starts with the role name (`student`, `students`,
/// `student-portal`, `faculty_dashboard`, ...). A source naming more than
/// one role is ambiguous and falls through to the next source.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathHeuristic;

impl RoleInference for PathHeuristic {
    fn infer(&self, page: &PageContext) -> Option<Role> {
        let path = urlencoding::decode(&page.path)
            .map_or_else(|_| page.path.to_lowercase(), |p| p.to_lowercase());
        let from_path = unique_role(
            path.split(['/', '?', '#', '&', '='])
                .filter(|segment| !segment.is_empty()),
        );
        from_path.or_else(|| {
            let title = page.title.to_lowercase();
            unique_role(title.split(|c: char| !c.is_alphanumeric()))
        })
    }
}

fn unique_role<'a>(words: impl Iterator<Item = &'a str>) -> Option<Role> {
    let mut found: Option<Role> = None;
    for word in words {
        let Some(role) = Role::ALL
            .into_iter()
            .find(|role| word.starts_with(role.as_str()))
        else {
            continue;
        };
        match found {
            None => found = Some(role),
            Some(existing) if existing == role => {}
            Some(_) => return None,
        }
    }
    found
}
