//! # User and authentication models
//!
//! ## [`UserIdentity`]
//!
//! The authenticated user as decoded from the bearer token's `payload` claim
//! (see [`crate::token`]). The backend encodes the primary key as `_id`; both
//! `_id` and `id` are accepted on input.
//!
//! ## [`UserRef`]
//!
//! Another user as listed by `/users`, returned by `/users/:id/public`, or
//! embedded as a review author. Same shape as the identity but never trusted
//! for authorization.
//!
//! ## Auth payloads
//!
//! [`SignUpForm`] and [`Credentials`] are the request bodies for
//! `/auth/sign-up` and `/auth/sign-in`; both answer with an [`AuthResponse`]
//! carrying the token (or an `err` field, handled by the client).

use serde::{Deserialize, Serialize};

/// Identity claim embedded in a credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
}

/// A user other than (or including) the current one, as the server lists it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

impl UserRef {
    /// Username for display, falling back to "Unknown" when the server sent none.
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            "Unknown"
        } else {
            &self.username
        }
    }
}

impl From<&UserIdentity> for UserRef {
    fn from(identity: &UserIdentity) -> Self {
        Self {
            id: identity.id.clone(),
            username: identity.username.clone(),
        }
    }
}

/// Body of `GET /users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<UserRef>,
}

/// Registration form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignUpForm {
    pub username: String,
    pub password: String,
    #[serde(rename = "passwordConf", default, skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<String>,
}

impl SignUpForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            password_confirmation: None,
        }
    }
}

/// Login form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Success body of the auth endpoints.
///
/// `token` is optional: a 2xx body with neither `token` nor `err` is a
/// malformed answer the session layer rejects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_accepts_both_id_spellings() {
        let a: UserIdentity = serde_json::from_str(r#"{"_id":"u1","username":"nova"}"#).unwrap();
        let b: UserIdentity = serde_json::from_str(r#"{"id":"u1","username":"nova"}"#).unwrap();
        assert_eq!(a, b);

        // Serialized back with the backend's spelling
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["_id"], "u1");
    }

    #[test]
    fn test_sign_up_form_omits_missing_confirmation() {
        let json = serde_json::to_value(SignUpForm::new("nova", "x")).unwrap();
        assert_eq!(json, serde_json::json!({ "username": "nova", "password": "x" }));
    }

    #[test]
    fn test_user_ref_display_name_fallback() {
        let anonymous: UserRef = serde_json::from_str(r#"{"_id":"u9"}"#).unwrap();
        assert_eq!(anonymous.display_name(), "Unknown");
    }
}
