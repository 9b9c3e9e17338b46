//! Wire models shared by the API client, the session layer and the views.

mod game;
mod review;
mod user;

pub use game::{
    CatalogGame, Cover, GameDetails, GameRef, HomeFeed, LibraryEntry, LibraryEntryPatch,
    LibraryGame, LinkedGame, Named, NewLibraryEntry, PlayStatus,
};
pub use review::{GameKey, Review, ReviewDraft};
pub use user::{AuthResponse, Credentials, SignUpForm, UserIdentity, UserList, UserRef};
