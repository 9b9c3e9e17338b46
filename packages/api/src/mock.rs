//! # In-process mock backend
//!
//! [`MockBackend`] serves the same REST surface as the real backend from an
//! axum router bound to `127.0.0.1:0`, backed by in-memory state. Tests point
//! an [`crate::ApiClient`] at [`MockBackend::config`] and exercise the real
//! HTTP path end to end.
//!
//! Beyond the endpoints themselves it offers a few test levers:
//!
//! | Method | Effect |
//! |--------|--------|
//! | [`hits`](MockBackend::hits) | number of requests a route received, e.g. `"GET /games/search"` |
//! | [`revoke_tokens`](MockBackend::revoke_tokens) | every issued token now answers 401, as if expired |
//! | [`report_errors_with_ok_status`](MockBackend::report_errors_with_ok_status) | rejections carry `{ err }` with status 200 |
//! | [`add_catalog_game`](MockBackend::add_catalog_game) | seed the provider catalog |
//! | [`seed_user`](MockBackend::seed_user) | register an account without a request |
//!
//! Tokens are JWT-shaped (`header.claims.signature`, base64url) with the
//! identity under `payload`, exactly what [`crate::token`] decodes. The
//! signature is not real; the backend recognizes its own tokens by value.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use store::ClientConfig;

use crate::models::*;

type Shared = Arc<Mutex<BackendState>>;

/// Build a JWT-shaped token whose claims carry `identity`.
pub fn mint_token(identity: &UserIdentity, nonce: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(json!({ "payload": identity, "iat": nonce }).to_string());
    let signature = URL_SAFE_NO_PAD.encode(format!("mock-signature-{}", nonce));
    format!("{}.{}.{}", header, claims, signature)
}

struct MockUser {
    identity: UserIdentity,
    password: String,
}

#[derive(Default)]
struct BackendState {
    users: Vec<MockUser>,
    issued: HashSet<String>,
    catalog: Vec<CatalogGame>,
    /// (owner id, entry)
    entries: Vec<(String, LibraryEntry)>,
    reviews: Vec<Review>,
    next_id: u64,
    hits: HashMap<String, usize>,
    ok_status_errors: bool,
}

impl BackendState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn issue_token(&mut self, identity: &UserIdentity) -> String {
        self.next_id += 1;
        let token = mint_token(identity, self.next_id);
        self.issued.insert(token.clone());
        token
    }

    fn register(&mut self, username: &str, password: &str) -> UserIdentity {
        // Users are numbered apart from other records: u1, u2, ...
        let identity = UserIdentity {
            id: format!("u{}", self.users.len() + 1),
            username: username.to_string(),
        };
        self.users.push(MockUser {
            identity: identity.clone(),
            password: password.to_string(),
        });
        identity
    }

    fn authenticate(&self, headers: &HeaderMap) -> Option<UserIdentity> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?;
        if !self.issued.contains(token) {
            return None;
        }
        let identity = crate::token::decode_identity(token).ok()?;
        self.users
            .iter()
            .any(|u| u.identity.id == identity.id)
            .then_some(identity)
    }

    fn fail(&self, status: StatusCode, message: &str) -> Response {
        let status = if self.ok_status_errors {
            StatusCode::OK
        } else {
            status
        };
        (status, Json(json!({ "err": message }))).into_response()
    }

    fn unauthorized(&self) -> Response {
        self.fail(StatusCode::UNAUTHORIZED, "Invalid token.")
    }
}

fn lock<'a>(state: &'a Shared, route: &str) -> MutexGuard<'a, BackendState> {
    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    *guard.hits.entry(route.to_string()).or_default() += 1;
    guard
}

/// A running mock backend; the server task stops when this is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    task: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> std::io::Result<Self> {
        let state: Shared = Arc::default();
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Mock backend stopped: {}", e);
            }
        });
        tracing::debug!("Mock backend listening on {}", addr);
        Ok(Self { addr, state, task })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this backend.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url())
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn hits(&self, route: &str) -> usize {
        self.state().hits.get(route).copied().unwrap_or(0)
    }

    pub fn revoke_tokens(&self) {
        self.state().issued.clear();
    }

    pub fn report_errors_with_ok_status(&self, enabled: bool) {
        self.state().ok_status_errors = enabled;
    }

    pub fn add_catalog_game(&self, id: u64, name: &str) -> CatalogGame {
        let game = CatalogGame {
            id,
            name: name.to_string(),
            summary: Some(format!("{} summary", name)),
            ..Default::default()
        };
        self.state().catalog.push(game.clone());
        game
    }

    pub fn seed_user(&self, username: &str, password: &str) -> UserIdentity {
        self.state().register(username, password)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/users", get(list_users))
        .route("/users/{user_id}/public", get(user_profile))
        .route("/games", get(my_library).post(create_entry))
        .route("/games/home", get(home_feed))
        .route("/games/search", get(search))
        .route("/games/details/{igdb_id}", get(details))
        .route("/games/user/{user_id}", get(user_library))
        .route("/games/{id}", put(update_entry).delete(delete_entry))
        .route("/reviews/game/{igdb_id}", get(game_reviews).post(create_review))
        .route("/reviews/{id}", put(update_review).delete(delete_review))
        .with_state(state)
}

// ----- auth -----

async fn sign_up(State(state): State<Shared>, Json(form): Json<SignUpForm>) -> Response {
    let mut s = lock(&state, "POST /auth/sign-up");
    if form.username.trim().is_empty() || form.password.is_empty() {
        return s.fail(StatusCode::BAD_REQUEST, "Username and password are required.");
    }
    if s.users.iter().any(|u| u.identity.username == form.username) {
        return s.fail(StatusCode::BAD_REQUEST, "Username already taken.");
    }
    let identity = s.register(&form.username, &form.password);
    let token = s.issue_token(&identity);
    (StatusCode::CREATED, Json(json!({ "token": token }))).into_response()
}

async fn sign_in(State(state): State<Shared>, Json(form): Json<Credentials>) -> Response {
    let mut s = lock(&state, "POST /auth/sign-in");
    let identity = s
        .users
        .iter()
        .find(|u| u.identity.username == form.username && u.password == form.password)
        .map(|u| u.identity.clone());
    let Some(identity) = identity else {
        return s.fail(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    };
    let token = s.issue_token(&identity);
    Json(json!({ "token": token })).into_response()
}

// ----- users -----

async fn list_users(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let s = lock(&state, "GET /users");
    if s.authenticate(&headers).is_none() {
        return s.unauthorized();
    }
    let users: Vec<UserRef> = s.users.iter().map(|u| UserRef::from(&u.identity)).collect();
    Json(UserList { users }).into_response()
}

async fn user_profile(
    State(state): State<Shared>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let s = lock(&state, "GET /users/:id/public");
    if s.authenticate(&headers).is_none() {
        return s.unauthorized();
    }
    match s.users.iter().find(|u| u.identity.id == user_id) {
        Some(user) => Json(UserRef::from(&user.identity)).into_response(),
        None => s.fail(StatusCode::NOT_FOUND, "User not found."),
    }
}

// ----- library -----

fn library_of(s: &BackendState, owner: &str) -> Vec<LibraryEntry> {
    s.entries
        .iter()
        .filter(|(o, _)| o == owner)
        .map(|(_, e)| e.clone())
        .collect()
}

async fn my_library(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let s = lock(&state, "GET /games");
    let Some(me) = s.authenticate(&headers) else {
        return s.unauthorized();
    };
    Json(library_of(&s, &me.id)).into_response()
}

async fn user_library(
    State(state): State<Shared>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let s = lock(&state, "GET /games/user/:id");
    if s.authenticate(&headers).is_none() {
        return s.unauthorized();
    }
    if !s.users.iter().any(|u| u.identity.id == user_id) {
        return s.fail(StatusCode::NOT_FOUND, "User not found.");
    }
    Json(library_of(&s, &user_id)).into_response()
}

fn hours_from(patch: &LibraryEntryPatch) -> Option<u32> {
    u32::try_from(patch.hours_played).ok()
}

async fn create_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<NewLibraryEntry>,
) -> Response {
    let mut s = lock(&state, "POST /games");
    let Some(me) = s.authenticate(&headers) else {
        return s.unauthorized();
    };
    let Some(hours_played) = hours_from(&body.fields) else {
        return s.fail(StatusCode::BAD_REQUEST, "hoursPlayed must be a non-negative integer.");
    };
    let duplicate = s
        .entries
        .iter()
        .any(|(o, e)| *o == me.id && e.game.igdb_id() == Some(body.igdb_game_id));
    if duplicate {
        return s.fail(StatusCode::BAD_REQUEST, "Game already in library.");
    }

    let game = LibraryGame {
        id: s.next_id("game"),
        igdb_game_id: body.igdb_game_id,
        title: body.title,
        cover_url: body.cover_url,
        summary: body.summary,
        platform: body.platform,
        genre: body.genre,
    };
    let entry = LibraryEntry {
        id: s.next_id("entry"),
        game: LinkedGame::Populated(game),
        status: body.fields.status,
        hours_played,
        notes: body.fields.notes,
        owned: body.fields.owned,
    };
    s.entries.push((me.id, entry.clone()));
    (StatusCode::CREATED, Json(entry)).into_response()
}

async fn update_entry(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<LibraryEntryPatch>,
) -> Response {
    let mut s = lock(&state, "PUT /games/:id");
    let Some(me) = s.authenticate(&headers) else {
        return s.unauthorized();
    };
    let Some(hours_played) = hours_from(&patch) else {
        return s.fail(StatusCode::BAD_REQUEST, "hoursPlayed must be a non-negative integer.");
    };
    let Some(index) = s
        .entries
        .iter()
        .position(|(o, e)| *o == me.id && e.id == id)
    else {
        return s.fail(StatusCode::NOT_FOUND, "Library entry not found.");
    };
    let (_, entry) = &mut s.entries[index];
    entry.status = patch.status;
    entry.hours_played = hours_played;
    entry.notes = patch.notes;
    entry.owned = patch.owned;
    Json(entry.clone()).into_response()
}

async fn delete_entry(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut s = lock(&state, "DELETE /games/:id");
    let Some(me) = s.authenticate(&headers) else {
        return s.unauthorized();
    };
    let Some(index) = s
        .entries
        .iter()
        .position(|(o, e)| *o == me.id && e.id == id)
    else {
        return s.fail(StatusCode::NOT_FOUND, "Library entry not found.");
    };
    s.entries.remove(index);
    Json(json!({ "message": "Game removed from library." })).into_response()
}

// ----- catalog -----

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

async fn home_feed(State(state): State<Shared>) -> Response {
    let s = lock(&state, "GET /games/home");
    Json(HomeFeed {
        upcoming: Vec::new(),
        trending: s.catalog.clone(),
        popular: s.catalog.iter().rev().cloned().collect(),
    })
    .into_response()
}

async fn search(State(state): State<Shared>, Query(params): Query<SearchParams>) -> Response {
    let s = lock(&state, "GET /games/search");
    let needle = params.query.to_lowercase();
    let results: Vec<CatalogGame> = s
        .catalog
        .iter()
        .filter(|g| g.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    Json(results).into_response()
}

async fn details(
    State(state): State<Shared>,
    Path(igdb_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    let s = lock(&state, "GET /games/details/:igdbId");
    let Some(game) = s.catalog.iter().find(|g| g.id == igdb_id).cloned() else {
        return s.fail(StatusCode::NOT_FOUND, "Game not found.");
    };
    let library_item = s.authenticate(&headers).and_then(|me| {
        s.entries
            .iter()
            .find(|(o, e)| *o == me.id && e.game.igdb_id() == Some(igdb_id))
            .map(|(_, e)| e.clone())
    });
    Json(GameDetails {
        igdb: Some(game),
        library_item,
        reviews: reviews_for(&s, igdb_id),
    })
    .into_response()
}

// ----- reviews -----

fn reviews_for(s: &BackendState, igdb_id: u64) -> Vec<Review> {
    s.reviews
        .iter()
        .filter(|r| r.game == Some(GameKey::Provider(igdb_id)))
        .cloned()
        .collect()
}

fn rating_from(draft: &ReviewDraft) -> Option<u8> {
    u8::try_from(draft.rating)
        .ok()
        .filter(|r| (1..=10).contains(r))
}

async fn game_reviews(State(state): State<Shared>, Path(igdb_id): Path<u64>) -> Response {
    let s = lock(&state, "GET /reviews/game/:igdbId");
    Json(reviews_for(&s, igdb_id)).into_response()
}

async fn create_review(
    State(state): State<Shared>,
    Path(igdb_id): Path<u64>,
    headers: HeaderMap,
    Json(draft): Json<ReviewDraft>,
) -> Response {
    let mut s = lock(&state, "POST /reviews/game/:igdbId");
    let Some(me) = s.authenticate(&headers) else {
        return s.unauthorized();
    };
    let Some(rating) = rating_from(&draft) else {
        return s.fail(StatusCode::BAD_REQUEST, "Rating must be between 1 and 10.");
    };
    if reviews_for(&s, igdb_id).iter().any(|r| r.is_by(&me.id)) {
        return s.fail(StatusCode::BAD_REQUEST, "You have already reviewed this game.");
    }
    let review = Review {
        id: s.next_id("review"),
        author: Some(UserRef::from(&me)),
        game: Some(GameKey::Provider(igdb_id)),
        rating,
        text: draft.text,
        created_at: None,
    };
    s.reviews.push(review.clone());
    (StatusCode::CREATED, Json(review)).into_response()
}

async fn update_review(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(draft): Json<ReviewDraft>,
) -> Response {
    let mut s = lock(&state, "PUT /reviews/:id");
    let Some(me) = s.authenticate(&headers) else {
        return s.unauthorized();
    };
    let Some(rating) = rating_from(&draft) else {
        return s.fail(StatusCode::BAD_REQUEST, "Rating must be between 1 and 10.");
    };
    let Some(index) = s.reviews.iter().position(|r| r.id == id) else {
        return s.fail(StatusCode::NOT_FOUND, "Review not found.");
    };
    if !s.reviews[index].is_by(&me.id) {
        return s.fail(StatusCode::FORBIDDEN, "You can only edit your own reviews.");
    }
    let review = &mut s.reviews[index];
    review.rating = rating;
    review.text = draft.text;
    Json(review.clone()).into_response()
}

async fn delete_review(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut s = lock(&state, "DELETE /reviews/:id");
    let Some(me) = s.authenticate(&headers) else {
        return s.unauthorized();
    };
    let Some(index) = s.reviews.iter().position(|r| r.id == id) else {
        return s.fail(StatusCode::NOT_FOUND, "Review not found.");
    };
    if !s.reviews[index].is_by(&me.id) {
        return s.fail(StatusCode::FORBIDDEN, "You can only delete your own reviews.");
    }
    s.reviews.remove(index);
    Json(json!({ "message": "Review deleted." })).into_response()
}
