//! # Collection synchronizer
//!
//! [`Synchronizer`] keeps a client-held, ordered collection in step with the
//! backend. Every mutation is confirm-then-apply: the remote call is issued
//! first and the local collection changes only after the server answers
//! success, always with the server's copy of the record.
//!
//! | Operation | On success | On failure |
//! |-----------|-----------|------------|
//! | [`create`](Synchronizer::create) | confirmed record appended at the end | unchanged |
//! | [`update`](Synchronizer::update) | record replaced in place by the confirmed one | unchanged |
//! | [`delete`](Synchronizer::delete) | record filtered out by id (no-op if absent) | unchanged |
//! | [`refresh`](Synchronizer::refresh) | collection replaced by the server listing | unchanged |
//!
//! Drafts and patches are validated locally with [`Validate`] before
//! anything is dispatched. Operations take `&self`: the collection sits behind
//! a shared handle that is locked only to apply a confirmed result, so
//! several calls may be in flight at once. Concurrent creates are not
//! coalesced; each is its own remote call. Clones share the collection.
//!
//! A synchronizer may be bound to a [`ViewScope`]. Once the scope is
//! cancelled (the view unmounted) no new call is dispatched and responses
//! still in flight are discarded with [`SyncError::Cancelled`]. When given a
//! [`SessionManager`], every failure is reported to it along with the
//! session epoch at dispatch, so a 401 ends the session that earned it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use api::ApiError;
use thiserror::Error;

use crate::session::SessionManager;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Rejected locally, nothing was sent.
    #[error("{0}")]
    Invalid(String),
    #[error("view closed before the response arrived")]
    Cancelled,
}

/// A record with a server-assigned id.
pub trait Record {
    fn record_id(&self) -> &str;
}

/// Local precondition checked before a draft or patch is dispatched.
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// The remote authority for one collection.
pub trait Remote {
    type Item: Record + Clone;
    type Draft: Validate;
    type Patch: Validate;

    fn list(&self) -> impl Future<Output = Result<Vec<Self::Item>, ApiError>>;
    fn create(&self, draft: &Self::Draft) -> impl Future<Output = Result<Self::Item, ApiError>>;
    fn update(
        &self,
        id: &str,
        patch: &Self::Patch,
    ) -> impl Future<Output = Result<Self::Item, ApiError>>;
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ApiError>>;
}

/// Cancellation flag tied to a view's lifetime. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    cancelled: Arc<AtomicBool>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

pub struct Synchronizer<R: Remote> {
    remote: Arc<R>,
    items: Arc<Mutex<Vec<R::Item>>>,
    scope: ViewScope,
    session: Option<SessionManager>,
}

impl<R: Remote> Clone for Synchronizer<R> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            items: self.items.clone(),
            scope: self.scope.clone(),
            session: self.session.clone(),
        }
    }
}

impl<R: Remote> Synchronizer<R> {
    pub fn new(remote: R) -> Self {
        Self::with_items(remote, Vec::new())
    }

    /// Start from records already fetched elsewhere (e.g. embedded in a
    /// details response).
    pub fn with_items(remote: R, items: Vec<R::Item>) -> Self {
        Self {
            remote: Arc::new(remote),
            items: Arc::new(Mutex::new(items)),
            scope: ViewScope::default(),
            session: None,
        }
    }

    pub fn bound_to(mut self, scope: ViewScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn reporting_to(mut self, session: SessionManager) -> Self {
        self.session = Some(session);
        self
    }

    /// Snapshot of the collection in order.
    pub fn items(&self) -> Vec<R::Item> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<R::Item> {
        self.find(|item| item.record_id() == id)
    }

    /// First record matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&R::Item) -> bool) -> Option<R::Item> {
        self.lock().iter().find(|item| predicate(item)).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub async fn refresh(&self) -> Result<(), SyncError> {
        let epoch = self.ensure_open("refresh")?;
        let result = self.remote.list().await;
        let items = self.settle("refresh", epoch, result)?;
        tracing::debug!("Loaded {} records", items.len());
        *self.lock() = items;
        Ok(())
    }

    pub async fn create(&self, draft: &R::Draft) -> Result<R::Item, SyncError> {
        check(draft)?;
        let epoch = self.ensure_open("create")?;
        let result = self.remote.create(draft).await;
        let item = self.settle("create", epoch, result)?;
        tracing::debug!("Appending confirmed record {}", item.record_id());
        self.lock().push(item.clone());
        Ok(item)
    }

    pub async fn update(&self, id: &str, patch: &R::Patch) -> Result<R::Item, SyncError> {
        check(patch)?;
        let epoch = self.ensure_open("update")?;
        let result = self.remote.update(id, patch).await;
        let item = self.settle("update", epoch, result)?;
        match self.lock().iter_mut().find(|i| i.record_id() == id) {
            Some(slot) => *slot = item.clone(),
            None => tracing::debug!("Confirmed record {} is not held locally", id),
        }
        Ok(item)
    }

    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let epoch = self.ensure_open("delete")?;
        let result = self.remote.delete(id).await;
        self.settle("delete", epoch, result)?;
        self.lock().retain(|i| i.record_id() != id);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<R::Item>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse to dispatch from a closed view; otherwise the session epoch the
    /// call goes out under.
    fn ensure_open(&self, op: &str) -> Result<Option<u64>, SyncError> {
        if self.scope.is_cancelled() {
            tracing::debug!("Not dispatching {}, view scope ended", op);
            return Err(SyncError::Cancelled);
        }
        Ok(self.session.as_ref().map(SessionManager::epoch))
    }

    fn settle<T>(
        &self,
        op: &str,
        epoch: Option<u64>,
        result: Result<T, ApiError>,
    ) -> Result<T, SyncError> {
        if let Err(e) = &result {
            tracing::warn!("Remote {} failed: {}", op, e);
            if let (Some(session), Some(epoch)) = (&self.session, epoch) {
                session.observe_failure(e, epoch);
            }
        }
        if self.scope.is_cancelled() {
            tracing::debug!("Discarding {} response, view scope ended", op);
            return Err(SyncError::Cancelled);
        }
        result.map_err(SyncError::Api)
    }
}

fn check<V: Validate>(value: &V) -> Result<(), SyncError> {
    value.validate().map_err(|message| {
        tracing::debug!("Rejected before dispatch: {}", message);
        SyncError::Invalid(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Barrier;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        label: String,
        revision: u32,
    }

    impl Record for Item {
        fn record_id(&self) -> &str {
            &self.id
        }
    }

    struct Label(&'static str);

    impl Validate for Label {
        fn validate(&self) -> Result<(), String> {
            if self.0.is_empty() {
                Err("Label is required.".into())
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct FakeRemote {
        calls: AtomicUsize,
        failure: Mutex<Option<ApiError>>,
        /// Cancelled while a call is "in flight".
        cancel_during_call: Option<ViewScope>,
        /// Creates wait here until enough of them are in flight together.
        gate: Option<Barrier>,
    }

    impl FakeRemote {
        fn failing(error: ApiError) -> Self {
            Self {
                failure: Mutex::new(Some(error)),
                ..Default::default()
            }
        }

        fn dispatch(&self) -> Result<usize, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(scope) = &self.cancel_during_call {
                scope.cancel();
            }
            match self.failure.lock().unwrap().clone() {
                Some(e) => Err(e),
                None => Ok(n),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Remote for FakeRemote {
        type Item = Item;
        type Draft = Label;
        type Patch = Label;

        async fn list(&self) -> Result<Vec<Item>, ApiError> {
            self.dispatch()?;
            Ok(vec![item("a", "first", 1), item("b", "second", 1)])
        }

        async fn create(&self, draft: &Label) -> Result<Item, ApiError> {
            let n = self.dispatch()?;
            if let Some(gate) = &self.gate {
                gate.wait().await;
            }
            Ok(item(&format!("srv-{}", n), draft.0, 1))
        }

        async fn update(&self, id: &str, patch: &Label) -> Result<Item, ApiError> {
            self.dispatch()?;
            Ok(item(id, patch.0, 2))
        }

        async fn delete(&self, _id: &str) -> Result<(), ApiError> {
            self.dispatch().map(|_| ())
        }
    }

    fn item(id: &str, label: &str, revision: u32) -> Item {
        Item {
            id: id.into(),
            label: label.into(),
            revision,
        }
    }

    fn seeded(remote: FakeRemote) -> Synchronizer<FakeRemote> {
        Synchronizer::with_items(remote, vec![item("a", "first", 1), item("b", "second", 1)])
    }

    #[tokio::test]
    async fn test_successful_create_appends_exactly_one_at_end() {
        let sync = seeded(FakeRemote::default());

        let created = sync.create(&Label("third")).await.unwrap();
        assert_eq!(sync.len(), 3);
        assert_eq!(sync.items().last(), Some(&created));
        assert_eq!(created.id, "srv-1");
    }

    #[tokio::test]
    async fn test_failed_create_leaves_collection_unchanged() {
        let sync = seeded(FakeRemote::failing(ApiError::Server("boom".into())));
        let before = sync.items().to_vec();

        let err = sync.create(&Label("third")).await.unwrap_err();
        assert_eq!(err, SyncError::Api(ApiError::Server("boom".into())));
        assert_eq!(sync.items(), before.as_slice());
    }

    #[tokio::test]
    async fn test_invalid_draft_is_never_dispatched() {
        let sync = seeded(FakeRemote::default());

        let err = sync.create(&Label("")).await.unwrap_err();
        assert_eq!(err, SyncError::Invalid("Label is required.".into()));
        let err = sync.update("a", &Label("")).await.unwrap_err();
        assert!(matches!(err, SyncError::Invalid(_)));
        assert_eq!(sync.remote().calls(), 0);
        assert_eq!(sync.len(), 2);
    }

    #[tokio::test]
    async fn test_identical_creates_are_not_deduplicated() {
        let sync = Synchronizer::new(FakeRemote::default());

        sync.create(&Label("same")).await.unwrap();
        sync.create(&Label("same")).await.unwrap();
        let items = sync.items();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["srv-1", "srv-2"]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_each_dispatched_and_appended() {
        let remote = FakeRemote {
            gate: Some(Barrier::new(2)),
            ..Default::default()
        };
        let sync = seeded(remote);

        // Neither call can finish until both are in flight
        let (first, second) = tokio::join!(
            sync.create(&Label("one")),
            sync.create(&Label("two")),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(sync.remote().calls(), 2);
        assert_eq!(sync.len(), 4);
        assert_ne!(first.id, second.id);
        assert_eq!(sync.get(&first.id), Some(first));
        assert_eq!(sync.get(&second.id), Some(second));
    }

    #[tokio::test]
    async fn test_clones_share_the_collection() {
        let sync = seeded(FakeRemote::default());
        let view = sync.clone();

        let created = sync.create(&Label("third")).await.unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.find(|i| i.label == "third"), Some(created));
    }

    #[tokio::test]
    async fn test_update_takes_server_copy_in_place() {
        let sync = seeded(FakeRemote::default());

        sync.update("a", &Label("renamed")).await.unwrap();
        assert_eq!(sync.items()[0], item("a", "renamed", 2));
        assert_eq!(sync.items()[1], item("b", "second", 1));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_record_untouched() {
        let sync = seeded(FakeRemote::failing(ApiError::Validation("nope".into())));

        assert!(sync.update("a", &Label("renamed")).await.is_err());
        assert_eq!(sync.get("a"), Some(item("a", "first", 1)));
    }

    #[tokio::test]
    async fn test_delete_removes_only_after_confirmation() {
        let sync = seeded(FakeRemote::failing(ApiError::Network("refused".into())));
        assert!(sync.delete("a").await.is_err());
        assert_eq!(sync.len(), 2);

        let sync = seeded(FakeRemote::default());
        sync.delete("a").await.unwrap();
        assert_eq!(sync.items(), [item("b", "second", 1)]);
    }

    #[tokio::test]
    async fn test_delete_of_unknown_id_is_local_noop() {
        let sync = seeded(FakeRemote::default());
        let before = sync.items().to_vec();

        sync.delete("zzz").await.unwrap();
        assert_eq!(sync.items(), before.as_slice());
    }

    #[tokio::test]
    async fn test_refresh_replaces_collection() {
        let sync = Synchronizer::new(FakeRemote::default());
        sync.refresh().await.unwrap();
        assert_eq!(sync.len(), 2);
    }

    #[tokio::test]
    async fn test_response_after_cancel_is_discarded() {
        let scope = ViewScope::new();
        let remote = FakeRemote {
            cancel_during_call: Some(scope.clone()),
            ..Default::default()
        };
        let sync = seeded(remote).bound_to(scope);

        let err = sync.create(&Label("late")).await.unwrap_err();
        assert_eq!(err, SyncError::Cancelled);
        assert_eq!(sync.len(), 2);
        assert_eq!(sync.remote().calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_scope_dispatches_nothing() {
        let scope = ViewScope::new();
        let sync = seeded(FakeRemote::default()).bound_to(scope.clone());
        scope.cancel();

        assert_eq!(sync.delete("a").await, Err(SyncError::Cancelled));
        assert_eq!(sync.refresh().await, Err(SyncError::Cancelled));
        assert_eq!(sync.remote().calls(), 0);
        assert_eq!(sync.len(), 2);
    }

    /// Signs in again while its own call is in flight, then answers 401 as if
    /// the call had carried the previous token.
    struct ResigningRemote {
        session: SessionManager,
    }

    impl Remote for ResigningRemote {
        type Item = Item;
        type Draft = Label;
        type Patch = Label;

        async fn list(&self) -> Result<Vec<Item>, ApiError> {
            Ok(Vec::new())
        }

        async fn create(&self, _draft: &Label) -> Result<Item, ApiError> {
            self.session
                .sign_in(&api::Credentials::new("nova", "x"))
                .await
                .map_err(|e| ApiError::Server(e.to_string()))?;
            Err(ApiError::Unauthorized("Invalid token.".into()))
        }

        async fn update(&self, id: &str, patch: &Label) -> Result<Item, ApiError> {
            Ok(item(id, patch.0, 2))
        }

        async fn delete(&self, _id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_401_for_previous_credential_keeps_newer_session() {
        use api::mock::MockBackend;
        use api::ApiClient;
        use store::{CredentialStore, MemoryStore, SharedCredentials};

        let backend = MockBackend::start().await.unwrap();
        backend.seed_user("nova", "x");
        let store = MemoryStore::new();
        let shared: SharedCredentials = Arc::new(store.clone());
        let session = SessionManager::new(ApiClient::new(&backend.config(), shared.clone()), shared);
        session
            .sign_in(&api::Credentials::new("nova", "x"))
            .await
            .unwrap();

        let sync = Synchronizer::new(ResigningRemote {
            session: session.clone(),
        })
        .reporting_to(session.clone());

        let err = sync.create(&Label("late")).await.unwrap_err();
        assert!(matches!(err, SyncError::Api(ApiError::Unauthorized(_))));
        assert!(sync.is_empty());
        assert!(session.is_authenticated());
        assert!(store.load().is_some());
    }
}
