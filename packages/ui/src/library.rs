//! # Game libraries
//!
//! A [`Library`] is one user's list of [`LibraryEntry`] records held in a
//! [`Synchronizer`]. Which list is fetched depends on the [`LibraryScope`]:
//!
//! | Scope | Endpoint | Mutable |
//! |-------|----------|---------|
//! | `Own` | `GET /games` | yes |
//! | `User(id)` | `GET /games/user/:id` | no |
//!
//! Viewing oneself through `User(id)` is treated as `Own`. Mutations of
//! someone else's library are refused locally; to copy one of their games use
//! [`CatalogGame::from`] on the embedded game and [`Library::add`] on your own.

use api::{
    ApiClient, ApiError, CatalogGame, LibraryEntry, LibraryEntryPatch, NewLibraryEntry,
    UserIdentity,
};

use crate::session::SessionManager;
use crate::sync::{Record, Remote, SyncError, Synchronizer, Validate, ViewScope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryScope {
    Own,
    User(String),
}

impl LibraryScope {
    pub fn resolve(self, current: Option<&UserIdentity>) -> Self {
        match self {
            LibraryScope::User(id) if current.is_some_and(|me| me.id == id) => LibraryScope::Own,
            other => other,
        }
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self, LibraryScope::Own)
    }
}

impl Record for LibraryEntry {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Validate for LibraryEntryPatch {
    fn validate(&self) -> Result<(), String> {
        if self.hours_played < 0 {
            return Err("Hours played must be 0 or more.".to_string());
        }
        if u32::try_from(self.hours_played).is_err() {
            return Err("Hours played is too large.".to_string());
        }
        Ok(())
    }
}

impl Validate for NewLibraryEntry {
    fn validate(&self) -> Result<(), String> {
        self.fields.validate()
    }
}

#[derive(Clone)]
pub struct LibraryRemote {
    api: ApiClient,
    scope: LibraryScope,
}

impl LibraryRemote {
    pub fn new(api: ApiClient, scope: LibraryScope) -> Self {
        Self { api, scope }
    }

    pub fn scope(&self) -> &LibraryScope {
        &self.scope
    }
}

impl Remote for LibraryRemote {
    type Item = LibraryEntry;
    type Draft = NewLibraryEntry;
    type Patch = LibraryEntryPatch;

    async fn list(&self) -> Result<Vec<LibraryEntry>, ApiError> {
        match &self.scope {
            LibraryScope::Own => self.api.my_library().await,
            LibraryScope::User(id) => self.api.user_library(id).await,
        }
    }

    async fn create(&self, draft: &NewLibraryEntry) -> Result<LibraryEntry, ApiError> {
        self.api.create_entry(draft).await
    }

    async fn update(&self, id: &str, patch: &LibraryEntryPatch) -> Result<LibraryEntry, ApiError> {
        self.api.update_entry(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete_entry(id).await
    }
}

/// Clones share the entries, so a component can hand one to a spawned task.
#[derive(Clone)]
pub struct Library {
    entries: Synchronizer<LibraryRemote>,
}

impl Library {
    /// Fetch the library for `scope` on behalf of the current session.
    pub async fn open(
        session: &SessionManager,
        scope: LibraryScope,
        view: ViewScope,
    ) -> Result<Self, SyncError> {
        let scope = scope.resolve(session.current_identity().as_ref());
        tracing::debug!("Opening library {:?}", scope);
        let remote = LibraryRemote::new(session.api().clone(), scope);
        let entries = Synchronizer::new(remote)
            .bound_to(view)
            .reporting_to(session.clone());
        entries.refresh().await?;
        Ok(Self { entries })
    }

    pub fn scope(&self) -> &LibraryScope {
        self.entries.remote().scope()
    }

    pub fn entries(&self) -> Vec<LibraryEntry> {
        self.entries.items()
    }

    pub fn get(&self, id: &str) -> Option<LibraryEntry> {
        self.entries.get(id)
    }

    pub fn entry_for_game(&self, igdb_id: u64) -> Option<LibraryEntry> {
        self.entries.find(|e| e.game.igdb_id() == Some(igdb_id))
    }

    /// "Add to My Library": create an entry for `game` with the form `fields`.
    pub async fn add(
        &self,
        game: &CatalogGame,
        fields: LibraryEntryPatch,
    ) -> Result<LibraryEntry, SyncError> {
        self.ensure_mutable()?;
        let draft = NewLibraryEntry::from_catalog(game, fields);
        self.entries.create(&draft).await
    }

    pub async fn edit(
        &self,
        id: &str,
        patch: &LibraryEntryPatch,
    ) -> Result<LibraryEntry, SyncError> {
        self.ensure_mutable()?;
        self.entries.update(id, patch).await
    }

    pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
        self.ensure_mutable()?;
        self.entries.delete(id).await
    }

    fn ensure_mutable(&self) -> Result<(), SyncError> {
        if self.scope().is_mutable() {
            Ok(())
        } else {
            Err(SyncError::Invalid(
                "Only your own library can be changed.".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::mock::MockBackend;
    use api::{PlayStatus, SignUpForm};
    use std::sync::Arc;
    use store::{CredentialStore, MemoryStore, SharedCredentials};

    async fn signed_up(backend: &MockBackend, username: &str) -> (SessionManager, MemoryStore) {
        let store = MemoryStore::new();
        let shared: SharedCredentials = Arc::new(store.clone());
        let session = SessionManager::new(ApiClient::new(&backend.config(), shared.clone()), shared);
        session
            .sign_up(&SignUpForm::new(username, "pw"))
            .await
            .unwrap();
        (session, store)
    }

    fn playing(hours: i64) -> LibraryEntryPatch {
        LibraryEntryPatch {
            status: PlayStatus::Playing,
            hours_played: hours,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_appends_server_confirmed_entry() {
        let backend = MockBackend::start().await.unwrap();
        let halo = backend.add_catalog_game(740, "Halo: Combat Evolved");
        let (session, _) = signed_up(&backend, "nova").await;

        let library = Library::open(&session, LibraryScope::Own, ViewScope::new())
            .await
            .unwrap();
        assert!(library.entries().is_empty());

        let entry = library.add(&halo, LibraryEntryPatch::default()).await.unwrap();
        assert!(!entry.id.is_empty());
        assert_eq!(entry.title(), "Halo: Combat Evolved");
        assert_eq!(entry.status, PlayStatus::WantToPlay);
        assert_eq!(library.entry_for_game(740), Some(entry));

        // A duplicate is the server's call, surfaced verbatim
        let err = library.add(&halo, LibraryEntryPatch::default()).await.unwrap_err();
        assert_eq!(
            err,
            SyncError::Api(ApiError::Validation("Game already in library.".into()))
        );
        assert_eq!(library.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_separate_requests() {
        let backend = MockBackend::start().await.unwrap();
        let halo = backend.add_catalog_game(740, "Halo: Combat Evolved");
        let gta = backend.add_catalog_game(1020, "Grand Theft Auto V");
        let (session, _) = signed_up(&backend, "nova").await;
        let library = Library::open(&session, LibraryScope::Own, ViewScope::new())
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            library.add(&halo, LibraryEntryPatch::default()),
            library.add(&gta, LibraryEntryPatch::default()),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(backend.hits("POST /games"), 2);
        assert_eq!(library.entries().len(), 2);
        assert!(library.entry_for_game(740).is_some());
        assert!(library.entry_for_game(1020).is_some());
    }

    #[tokio::test]
    async fn test_negative_hours_rejected_before_dispatch() {
        let backend = MockBackend::start().await.unwrap();
        let halo = backend.add_catalog_game(740, "Halo: Combat Evolved");
        let (session, _) = signed_up(&backend, "nova").await;
        let library = Library::open(&session, LibraryScope::Own, ViewScope::new())
            .await
            .unwrap();
        let entry = library.add(&halo, playing(3)).await.unwrap();

        let err = library.edit(&entry.id, &playing(-1)).await.unwrap_err();
        assert_eq!(err, SyncError::Invalid("Hours played must be 0 or more.".into()));
        assert_eq!(backend.hits("PUT /games/:id"), 0);
        assert_eq!(library.get(&entry.id).unwrap().hours_played, 3);

        let err = library.add(&halo, playing(-1)).await.unwrap_err();
        assert!(matches!(err, SyncError::Invalid(_)));
        assert_eq!(backend.hits("POST /games"), 1);
    }

    #[tokio::test]
    async fn test_edit_merges_server_response() {
        let backend = MockBackend::start().await.unwrap();
        let halo = backend.add_catalog_game(740, "Halo: Combat Evolved");
        let (session, _) = signed_up(&backend, "nova").await;
        let library = Library::open(&session, LibraryScope::Own, ViewScope::new())
            .await
            .unwrap();
        let entry = library.add(&halo, LibraryEntryPatch::default()).await.unwrap();

        let patch = LibraryEntryPatch {
            status: PlayStatus::Completed,
            hours_played: 12,
            notes: "Legendary".into(),
            owned: true,
        };
        let updated = library.edit(&entry.id, &patch).await.unwrap();
        assert_eq!(updated.hours_played, 12);
        // The populated game comes back from the server, not from the patch
        assert_eq!(library.get(&entry.id).unwrap().title(), "Halo: Combat Evolved");
        assert_eq!(library.get(&entry.id), Some(updated));

        library.remove(&entry.id).await.unwrap();
        assert!(library.entries().is_empty());
    }

    #[tokio::test]
    async fn test_other_users_library_is_read_only() {
        let backend = MockBackend::start().await.unwrap();
        let halo = backend.add_catalog_game(740, "Halo: Combat Evolved");
        let (owner, _) = signed_up(&backend, "ash").await;
        let owner_id = owner.current_identity().unwrap().id;
        Library::open(&owner, LibraryScope::Own, ViewScope::new())
            .await
            .unwrap()
            .add(&halo, LibraryEntryPatch::default())
            .await
            .unwrap();

        let (visitor, _) = signed_up(&backend, "nova").await;
        let theirs = Library::open(&visitor, LibraryScope::User(owner_id), ViewScope::new())
            .await
            .unwrap();
        assert_eq!(theirs.entries().len(), 1);
        assert!(!theirs.scope().is_mutable());

        let id = theirs.entries()[0].id.clone();
        assert!(matches!(theirs.remove(&id).await, Err(SyncError::Invalid(_))));
        assert_eq!(backend.hits("DELETE /games/:id"), 0);

        // Their copy converts back into a catalog record for our own library
        let game = CatalogGame::from(theirs.entries()[0].game.populated().unwrap());
        let mine = Library::open(&visitor, LibraryScope::Own, ViewScope::new())
            .await
            .unwrap();
        mine.add(&game, LibraryEntryPatch::default()).await.unwrap();
        assert_eq!(mine.entry_for_game(740).unwrap().title(), "Halo: Combat Evolved");
    }

    #[tokio::test]
    async fn test_own_id_scope_resolves_to_own() {
        let backend = MockBackend::start().await.unwrap();
        let (session, _) = signed_up(&backend, "nova").await;
        let me = session.current_identity().unwrap();

        let library = Library::open(&session, LibraryScope::User(me.id), ViewScope::new())
            .await
            .unwrap();
        assert_eq!(library.scope(), &LibraryScope::Own);
        assert_eq!(backend.hits("GET /games"), 1);
        assert_eq!(backend.hits("GET /games/user/:id"), 0);
    }

    #[tokio::test]
    async fn test_expired_token_signs_out() {
        let backend = MockBackend::start().await.unwrap();
        let halo = backend.add_catalog_game(740, "Halo: Combat Evolved");
        let (session, store) = signed_up(&backend, "nova").await;
        let library = Library::open(&session, LibraryScope::Own, ViewScope::new())
            .await
            .unwrap();

        backend.revoke_tokens();
        let err = library.add(&halo, LibraryEntryPatch::default()).await.unwrap_err();
        assert!(matches!(err, SyncError::Api(ApiError::Unauthorized(_))));
        assert!(library.entries().is_empty());
        assert_eq!(session.current_identity(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_hours_validation() {
        assert!(playing(0).validate().is_ok());
        assert!(playing(10_000).validate().is_ok());
        assert!(playing(-1).validate().is_err());
        assert!(playing(i64::MAX).validate().is_err());
    }
}
