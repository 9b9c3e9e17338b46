//! # Session manager
//!
//! [`SessionManager`] is the single owner of "who is signed in". It is a
//! cheap handle (`Arc` inside) shared by every view through the Dioxus
//! context; all sessions created from one handle are the same session.
//!
//! ## State machine
//!
//! ```text
//! Anonymous --sign_in / sign_up ok--> Authenticated
//! Authenticated --sign_out--------> Anonymous   (SignedOut)
//! Authenticated --401 observed----> Anonymous   (Expired)
//! ```
//!
//! On construction the stored credential is decoded. A token that does not
//! decode is removed from the store and the session starts anonymous; it is
//! never half-trusted. There is no refresh: expiry is noticed lazily when a
//! protected call answers 401 and the failure is handed to
//! [`SessionManager::observe_failure`].
//!
//! Every credential change bumps the session [`epoch`](SessionManager::epoch).
//! A caller reads it before dispatching and passes it back with the failure,
//! so a 401 earned by a superseded token cannot end a newer session.
//!
//! ## Notification
//!
//! - [`subscribe`](SessionManager::subscribe): a `watch` receiver of the
//!   current [`SessionState`], for re-rendering.
//! - [`events`](SessionManager::events): a `broadcast` receiver of
//!   [`SessionEvent`]s, for toasts.
//!
//! Only this module writes to the credential store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use api::{
    ApiClient, ApiError, AuthResponse, Credential, Credentials, SignUpForm, TokenError,
    UserIdentity,
};
use store::{ClientConfig, CredentialStore, SharedCredentials, StoreError};
use thiserror::Error;
use tokio::sync::{broadcast, watch};

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("server issued an unusable token: {0}")]
    Token(#[from] TokenError),
    #[error("server response carried no token")]
    MissingToken,
    #[error("could not keep the session: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(UserIdentity),
}

impl SessionState {
    pub fn identity(&self) -> Option<&UserIdentity> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(UserIdentity),
    SignedUp(UserIdentity),
    SignedOut,
    Expired,
}

struct Inner {
    api: ApiClient,
    credentials: SharedCredentials,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    epoch: AtomicU64,
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl PartialEq for SessionManager {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Build a session over `credentials`, restoring a stored sign-in.
    ///
    /// `api` should read from the same credential store.
    pub fn new(api: ApiClient, credentials: SharedCredentials) -> Self {
        let initial = restore(credentials.as_ref());
        let (state, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                api,
                credentials,
                state,
                events,
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Open the platform credential store and an API client for `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let credentials = config.open_credentials();
        let api = ApiClient::new(config, credentials.clone());
        Self::new(api, credentials)
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Synchronous read of the signed-in identity. Never touches the network.
    pub fn current_identity(&self) -> Option<UserIdentity> {
        self.inner.state.borrow().identity().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Changes whenever the credential does. Read it before dispatching a
    /// protected call and hand it to [`observe_failure`](Self::observe_failure).
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<UserIdentity, AuthError> {
        let response = self
            .inner
            .api
            .sign_up(form)
            .await
            .inspect_err(|e| tracing::warn!("Sign-up for {} rejected: {}", form.username, e))?;
        let identity = self.establish(response)?;
        tracing::info!("Signed up as {}", identity.username);
        self.emit(SessionEvent::SignedUp(identity.clone()));
        Ok(identity)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<UserIdentity, AuthError> {
        let response = self
            .inner
            .api
            .sign_in(credentials)
            .await
            .inspect_err(|e| {
                tracing::warn!("Sign-in for {} rejected: {}", credentials.username, e)
            })?;
        let identity = self.establish(response)?;
        tracing::info!("Signed in as {}", identity.username);
        self.emit(SessionEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    pub fn sign_out(&self) {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        self.inner.credentials.clear();
        self.inner.state.send_replace(SessionState::Anonymous);
        tracing::info!("Signed out");
        self.emit(SessionEvent::SignedOut);
    }

    /// Report a failed protected call dispatched at `epoch`. A 401 while
    /// signed in with that same credential ends the session; returns whether
    /// it did.
    pub fn observe_failure(&self, error: &ApiError, epoch: u64) -> bool {
        if !error.is_unauthorized() || !self.is_authenticated() {
            return false;
        }
        if self
            .inner
            .epoch
            .compare_exchange(epoch, epoch + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Ignoring 401 from a superseded credential");
            return false;
        }
        tracing::warn!("Credential rejected by server, session expired");
        self.inner.credentials.clear();
        self.inner.state.send_replace(SessionState::Anonymous);
        self.emit(SessionEvent::Expired);
        true
    }

    /// Store the issued token and switch to its identity. Leaves the session
    /// untouched unless the token decodes and is stored.
    fn establish(&self, response: AuthResponse) -> Result<UserIdentity, AuthError> {
        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let credential = Credential::decode(token)?;
        self.inner
            .credentials
            .save(credential.token())
            .inspect_err(|e| tracing::warn!("Issued token not stored: {}", e))?;
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        let identity = credential.into_identity();
        self.inner
            .state
            .send_replace(SessionState::Authenticated(identity.clone()));
        Ok(identity)
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.inner.events.send(event);
    }
}

fn restore(credentials: &dyn CredentialStore) -> SessionState {
    let Some(token) = credentials.load() else {
        tracing::debug!("No stored credential, starting anonymous");
        return SessionState::Anonymous;
    };
    match Credential::decode(token) {
        Ok(credential) => {
            tracing::info!("Restored session for {}", credential.identity().username);
            SessionState::Authenticated(credential.into_identity())
        }
        Err(e) => {
            tracing::warn!("Discarding stored credential: {}", e);
            credentials.clear();
            SessionState::Anonymous
        }
    }
}
