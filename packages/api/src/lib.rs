//! # API crate — typed access to the game-library backend
//!
//! This crate is everything the client knows about the backend: the wire
//! models, how to read an identity out of a bearer token, how to call each
//! endpoint, and how to classify what comes back.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`models`] | — | Users, catalog games, library entries, reviews and their request bodies |
//! | [`token`] | — | Decoding the identity claim from a JWT-shaped bearer token |
//! | [`error`] | — | [`ApiError`], [`FailureKind`] and the response classifier |
//! | [`client`] | — | [`ApiClient`], one async method per endpoint |
//! | `mock` | `mock-server` | In-process axum backend implementing the same REST surface, for tests |

pub mod client;
pub mod error;
pub mod models;
pub mod token;

#[cfg(any(test, feature = "mock-server"))]
pub mod mock;

pub use client::ApiClient;
pub use error::{ApiError, FailureKind};
pub use models::*;
pub use token::{decode_identity, Credential, TokenError};
