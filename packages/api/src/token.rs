//! # Credential decoding
//!
//! The backend issues JWT-shaped bearer tokens: three dot-separated segments
//! whose middle one is base64-encoded JSON of the form
//! `{ "payload": { "_id": ..., "username": ... }, "iat": ..., ... }`.
//!
//! The client never verifies the signature; the server does that on every
//! request. Decoding only extracts the identity so the UI knows who is signed
//! in. A [`Credential`] therefore exists only for tokens whose claim decodes;
//! anything else is a [`TokenError`], which the session layer downgrades to
//! "signed out".
//!
//! Both the URL-safe alphabet (what JWT libraries emit) and the standard one
//! are accepted, with or without padding.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;

use crate::models::UserIdentity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token does not have three segments")]
    Malformed,
    #[error("token claim segment is not valid base64")]
    Encoding,
    #[error("token claims are not a valid identity payload: {0}")]
    Claims(String),
}

#[derive(Deserialize)]
struct Claims {
    payload: UserIdentity,
}

/// A structurally valid bearer token together with the identity it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    identity: UserIdentity,
}

impl Credential {
    /// Decode `token`, keeping it only if its claim yields an identity.
    pub fn decode(token: impl Into<String>) -> Result<Self, TokenError> {
        let token = token.into();
        let identity = decode_identity(&token)?;
        Ok(Self { token, identity })
    }

    /// The raw bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn into_identity(self) -> UserIdentity {
        self.identity
    }
}

/// Extract the identity claim from a bearer token.
pub fn decode_identity(token: &str) -> Result<UserIdentity, TokenError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let [_, claims, _] = segments.as_slice() else {
        return Err(TokenError::Malformed);
    };
    if claims.is_empty() {
        return Err(TokenError::Malformed);
    }

    let bytes = decode_segment(claims)?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))?;
    Ok(claims.payload)
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    STANDARD_NO_PAD
        .decode(normalized)
        .map_err(|_| TokenError::Encoding)
}
