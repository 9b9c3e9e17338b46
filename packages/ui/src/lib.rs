//! This crate contains the session and data-sync layer shared by every view.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`session`] | [`SessionManager`]: sign-in, sign-up, sign-out, expiry, change notification |
//! | [`sync`] | [`Synchronizer`]: confirm-then-apply mutations of a remote collection |
//! | [`library`] | Library entries over the synchronizer, own and other users' |
//! | [`reviews`] | Game reviews over the synchronizer, one-per-author affordance |
//! | [`search`] | Catalog search state |
//! | [`navigation`] | [`NavigationRelay`]: one-hop state hand-off between views |
//! | [`guard`] | Route table and per-route sign-in policy |
//! | [`components`] | Dioxus provider, hooks and guard component |

pub mod components;
pub use components::{
    use_navigation_relay, use_session, use_session_event, use_session_state, Guarded,
    SessionProvider, SignOutButton,
};

pub mod guard;
pub use guard::{decide, AppRoute, Fallback, GuardPolicy, RenderDecision, RouteGuard};

pub mod library;
pub use library::{Library, LibraryRemote, LibraryScope};

pub mod navigation;
pub use navigation::{BackTarget, NavigationContext, NavigationRelay};

pub mod reviews;
pub use reviews::{can_write_review, game_reviews, own_review, ReviewRemote};

pub mod search;
pub use search::SearchState;

pub mod session;
pub use session::{AuthError, SessionEvent, SessionManager, SessionState};

pub mod sync;
pub use sync::{Record, Remote, SyncError, Synchronizer, Validate, ViewScope};
