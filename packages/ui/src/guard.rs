//! # Route guard
//!
//! Each [`AppRoute`] carries the policy applied when nobody is signed in.
//! [`decide`] is a pure function of that policy and the current identity, so
//! the guard can be re-run on every render: a sign-out while a protected
//! view is mounted flips it on the next render.
//!
//! | Route | Path | Anonymous visitor gets |
//! |-------|------|------------------------|
//! | `Dashboard` | `/` | public home view |
//! | `Library` | `/library` | public home view |
//! | `UserLibrary` | `/library/:userId` | "Please sign in to view libraries." |
//! | `LibraryEdit` | `/games/:id/edit` | redirect to `/` |
//! | `LibraryAdd` | `/games/add/:igdbId` | redirect to `/` |
//! | `ReviewEdit` | `/reviews/:id/edit` | "Please sign in." |
//! | `SearchGames` | `/games/search` | the view |
//! | `GameDetails` | `/games/details/:igdbId` | the view |
//! | `SignIn`, `SignUp` | `/sign-in`, `/sign-up` | the view |

use std::fmt;

use api::UserIdentity;

use crate::session::SessionManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppRoute {
    Dashboard,
    Library,
    UserLibrary { user_id: String },
    LibraryEdit { id: String },
    LibraryAdd { igdb_id: u64 },
    ReviewEdit { id: String },
    SearchGames,
    GameDetails { igdb_id: u64 },
    SignIn,
    SignUp,
}

/// What an anonymous visitor sees instead of a protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Home,
    Message(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardPolicy {
    Public,
    Fallback(Fallback),
    Redirect(AppRoute),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderDecision {
    Render,
    Fallback(Fallback),
    Redirect(AppRoute),
}

impl AppRoute {
    pub fn policy(&self) -> GuardPolicy {
        match self {
            // Signed-out visitors land on the public home page instead.
            AppRoute::Dashboard | AppRoute::Library => GuardPolicy::Fallback(Fallback::Home),
            AppRoute::UserLibrary { .. } => {
                GuardPolicy::Fallback(Fallback::Message("Please sign in to view libraries."))
            }
            // Forms: nothing useful to show, send them home.
            AppRoute::LibraryEdit { .. } | AppRoute::LibraryAdd { .. } => {
                GuardPolicy::Redirect(AppRoute::Dashboard)
            }
            AppRoute::ReviewEdit { .. } => {
                GuardPolicy::Fallback(Fallback::Message("Please sign in."))
            }
            AppRoute::SearchGames
            | AppRoute::GameDetails { .. }
            | AppRoute::SignIn
            | AppRoute::SignUp => GuardPolicy::Public,
        }
    }

    pub fn path(&self) -> String {
        match self {
            AppRoute::Dashboard => "/".to_string(),
            AppRoute::Library => "/library".to_string(),
            AppRoute::UserLibrary { user_id } => format!("/library/{}", user_id),
            AppRoute::LibraryEdit { id } => format!("/games/{}/edit", id),
            AppRoute::LibraryAdd { igdb_id } => format!("/games/add/{}", igdb_id),
            AppRoute::ReviewEdit { id } => format!("/reviews/{}/edit", id),
            AppRoute::SearchGames => "/games/search".to_string(),
            AppRoute::GameDetails { igdb_id } => format!("/games/details/{}", igdb_id),
            AppRoute::SignIn => "/sign-in".to_string(),
            AppRoute::SignUp => "/sign-up".to_string(),
        }
    }

    /// Match a location path (query string and trailing slash ignored).
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let route = match segments.as_slice() {
            [] => AppRoute::Dashboard,
            ["library"] => AppRoute::Library,
            ["library", user_id] => AppRoute::UserLibrary {
                user_id: user_id.to_string(),
            },
            ["games", "search"] => AppRoute::SearchGames,
            ["games", "details", igdb_id] => AppRoute::GameDetails {
                igdb_id: igdb_id.parse().ok()?,
            },
            ["games", "add", igdb_id] => AppRoute::LibraryAdd {
                igdb_id: igdb_id.parse().ok()?,
            },
            ["games", id, "edit"] => AppRoute::LibraryEdit { id: id.to_string() },
            ["reviews", id, "edit"] => AppRoute::ReviewEdit { id: id.to_string() },
            ["sign-in"] => AppRoute::SignIn,
            ["sign-up"] => AppRoute::SignUp,
            _ => return None,
        };
        Some(route)
    }
}

impl fmt::Display for AppRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

pub fn decide(policy: &GuardPolicy, identity: Option<&UserIdentity>) -> RenderDecision {
    if identity.is_some() {
        return RenderDecision::Render;
    }
    match policy {
        GuardPolicy::Public => RenderDecision::Render,
        GuardPolicy::Fallback(fallback) => RenderDecision::Fallback(*fallback),
        GuardPolicy::Redirect(target) => RenderDecision::Redirect(target.clone()),
    }
}

/// [`decide`] against a live session.
#[derive(Clone, PartialEq)]
pub struct RouteGuard {
    session: SessionManager,
}

impl RouteGuard {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn check(&self, route: &AppRoute) -> RenderDecision {
        let decision = decide(&route.policy(), self.session.current_identity().as_ref());
        if decision != RenderDecision::Render {
            tracing::debug!("Guarding {}: {:?}", route, decision);
        }
        decision
    }
}
