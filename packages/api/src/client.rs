//! # Typed REST client for the game-library backend
//!
//! [`ApiClient`] is a thin, cloneable wrapper over [`reqwest::Client`] that
//! knows the backend's base URL and reads the bearer token from the shared
//! [`store::CredentialStore`] on every request. It does not check whether the
//! token is still valid; the server's status code decides that.
//!
//! Each endpoint method returns `Result<T, ApiError>` where `T` is the typed
//! payload; raw JSON never leaves this module. Responses go through
//! [`crate::error::classify`]. There are no automatic retries and no timeouts
//! beyond the transport's own.
//!
//! ## Endpoints
//!
//! | Method | Path | Client method |
//! |--------|------|---------------|
//! | POST | `/auth/sign-up` | [`sign_up`](ApiClient::sign_up) |
//! | POST | `/auth/sign-in` | [`sign_in`](ApiClient::sign_in) |
//! | GET | `/users` | [`list_users`](ApiClient::list_users) |
//! | GET | `/users/:id/public` | [`user_profile`](ApiClient::user_profile) |
//! | GET | `/games` | [`my_library`](ApiClient::my_library) |
//! | GET | `/games/user/:id` | [`user_library`](ApiClient::user_library) |
//! | GET | `/games/home` | [`home_feed`](ApiClient::home_feed) |
//! | GET | `/games/search?query=` | [`search_games`](ApiClient::search_games) |
//! | GET | `/games/details/:igdbId` | [`game_details`](ApiClient::game_details) |
//! | POST / PUT / DELETE | `/games[/:id]` | [`create_entry`](ApiClient::create_entry), [`update_entry`](ApiClient::update_entry), [`delete_entry`](ApiClient::delete_entry) |
//! | GET / POST | `/reviews/game/:igdbId` | [`game_reviews`](ApiClient::game_reviews), [`create_review`](ApiClient::create_review) |
//! | PUT / DELETE | `/reviews/:id` | [`update_review`](ApiClient::update_review), [`delete_review`](ApiClient::delete_review) |

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use store::{ClientConfig, SharedCredentials};

use crate::error::{classify, ApiError};
use crate::models::*;

/// HTTP client bound to one backend and one credential store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: SharedCredentials,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, credentials: SharedCredentials) -> Self {
        Self::with_http(reqwest::Client::new(), config, credentials)
    }

    /// Use a preconfigured reqwest client (proxies, custom TLS, ...).
    pub fn with_http(
        http: reqwest::Client,
        config: &ClientConfig,
        credentials: SharedCredentials,
    ) -> Self {
        Self {
            http,
            base_url: config.api.base_url.clone(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ----- auth -----

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<AuthResponse, ApiError> {
        self.send(Method::POST, "/auth/sign-up", Some(form), None).await
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.send(Method::POST, "/auth/sign-in", Some(credentials), None)
            .await
    }

    // ----- users -----

    pub async fn list_users(&self) -> Result<Vec<UserRef>, ApiError> {
        let list: UserList = self.get("/users").await?;
        Ok(list.users)
    }

    pub async fn user_profile(&self, user_id: &str) -> Result<UserRef, ApiError> {
        self.get(&format!("/users/{}/public", user_id)).await
    }

    // ----- library -----

    pub async fn my_library(&self) -> Result<Vec<LibraryEntry>, ApiError> {
        self.get("/games").await
    }

    pub async fn user_library(&self, user_id: &str) -> Result<Vec<LibraryEntry>, ApiError> {
        self.get(&format!("/games/user/{}", user_id)).await
    }

    pub async fn create_entry(&self, entry: &NewLibraryEntry) -> Result<LibraryEntry, ApiError> {
        self.send(Method::POST, "/games", Some(entry), None).await
    }

    pub async fn update_entry(
        &self,
        id: &str,
        patch: &LibraryEntryPatch,
    ) -> Result<LibraryEntry, ApiError> {
        self.send(Method::PUT, &format!("/games/{}", id), Some(patch), None)
            .await
    }

    pub async fn delete_entry(&self, id: &str) -> Result<(), ApiError> {
        let _: Value = self
            .send(Method::DELETE, &format!("/games/{}", id), None::<&()>, None)
            .await?;
        Ok(())
    }

    // ----- catalog -----

    pub async fn home_feed(&self) -> Result<HomeFeed, ApiError> {
        self.get("/games/home").await
    }

    pub async fn search_games(&self, query: &str) -> Result<Vec<CatalogGame>, ApiError> {
        self.send(
            Method::GET,
            "/games/search",
            None::<&()>,
            Some(&[("query", query)][..]),
        )
        .await
    }

    pub async fn game_details(&self, igdb_id: u64) -> Result<GameDetails, ApiError> {
        self.get(&format!("/games/details/{}", igdb_id)).await
    }

    // ----- reviews -----

    pub async fn game_reviews(&self, igdb_id: u64) -> Result<Vec<Review>, ApiError> {
        self.get(&format!("/reviews/game/{}", igdb_id)).await
    }

    pub async fn create_review(
        &self,
        igdb_id: u64,
        draft: &ReviewDraft,
    ) -> Result<Review, ApiError> {
        self.send(
            Method::POST,
            &format!("/reviews/game/{}", igdb_id),
            Some(draft),
            None,
        )
        .await
    }

    pub async fn update_review(&self, id: &str, draft: &ReviewDraft) -> Result<Review, ApiError> {
        self.send(Method::PUT, &format!("/reviews/{}", id), Some(draft), None)
            .await
    }

    pub async fn delete_review(&self, id: &str) -> Result<(), ApiError> {
        let _: Value = self
            .send(Method::DELETE, &format!("/reviews/{}", id), None::<&()>, None)
            .await?;
        Ok(())
    }

    // ----- plumbing -----

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::GET, path, None::<&()>, None).await
    }

    /// Attach the bearer token, if one is stored.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.load() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("{} {}", method, path);

        let mut request = self
            .authorize(self.http.request(method.clone(), format!("{}{}", self.base_url, path)));
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("{} {} failed to send: {}", method, path, e);
            ApiError::from(e)
        })?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            tracing::warn!("{} {} body read failed: {}", method, path, e);
            ApiError::from(e)
        })?;

        classify(status, &text).inspect_err(|e| {
            tracing::warn!("{} {} -> {}: {}", method, path, status, e);
        })
    }
}
