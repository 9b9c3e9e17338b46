//! # Credential persistence — the bearer token behind every session
//!
//! The client keeps exactly one piece of durable state: the bearer token
//! returned by `/auth/sign-in` or `/auth/sign-up`, stored under a fixed key.
//! Everything else (session identity, collections, navigation context) is
//! derived or ephemeral.
//!
//! ## [`CredentialStore`] trait
//!
//! Three synchronous methods: `save`, `load` and `clear`. Implementations are
//! pure storage and perform no validation; decoding the token into an identity
//! is the session layer's job. Backends live in sibling modules:
//!
//! | Backend | Platform | Survives reload |
//! |---------|----------|-----------------|
//! | [`crate::MemoryStore`] | any (tests, fallback) | only while a clone is alive |
//! | [`crate::FileStore`] | desktop / mobile | yes, per data directory |
//! | `LocalStorageStore` | web (`web` feature) | yes, per browser profile |
//!
//! Browser `localStorage` is synchronous, so the trait is too. This keeps
//! `load()` callable from a render without suspending.
//!
//! A failed `save` is an error: a session whose token was never stored would
//! send no bearer header. A failed `load` reads as "no token".

use std::sync::Arc;

use thiserror::Error;

/// Storage key used when the configuration does not override it.
pub const DEFAULT_TOKEN_KEY: &str = "token";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("credential storage is unavailable")]
    Unavailable,
    #[error("failed to write credential: {0}")]
    Write(String),
}

/// Persistence for a single bearer token.
pub trait CredentialStore: Send + Sync {
    /// Store `token`, replacing any previous one.
    fn save(&self, token: &str) -> Result<(), StoreError>;
    /// The stored token, if any.
    fn load(&self) -> Option<String>;
    /// Remove the stored token. Clearing an empty store is a no-op.
    fn clear(&self);
}

/// Process-wide handle to the credential store, shared by the session
/// manager (the only writer) and the API client (a reader).
pub type SharedCredentials = Arc<dyn CredentialStore>;
