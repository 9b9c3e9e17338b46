use serde::{Deserialize, Serialize};

use super::user::UserRef;

/// How a review refers to its game: the server stores either the provider
/// id or its own game `_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameKey {
    Provider(u64),
    Local(String),
}

/// A user's review of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    /// Absent when the author's account no longer exists.
    #[serde(default)]
    pub author: Option<UserRef>,
    #[serde(rename = "gameId", default, skip_serializing_if = "Option::is_none")]
    pub game: Option<GameKey>,
    pub rating: u8,
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Review {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(UserRef::display_name)
            .unwrap_or("Unknown")
    }

    pub fn is_by(&self, user_id: &str) -> bool {
        self.author.as_ref().is_some_and(|a| a.id == user_id)
    }
}

/// Body of review create / update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub rating: i64,
    #[serde(rename = "Text")]
    pub text: String,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        Self {
            rating: 1,
            text: String::new(),
        }
    }
}

/// Prefill the edit form from an existing review.
impl From<&Review> for ReviewDraft {
    fn from(review: &Review) -> Self {
        Self {
            rating: i64::from(review.rating),
            text: review.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_review_wire_shape() {
        let review: Review = serde_json::from_value(json!({
            "_id": "r1",
            "author": { "_id": "u1", "username": "nova" },
            "gameId": 740,
            "rating": 9,
            "Text": "Still holds up",
            "createdAt": "2024-05-01T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(review.author_name(), "nova");
        assert_eq!(review.game, Some(GameKey::Provider(740)));
        assert!(review.is_by("u1"));
        assert!(!review.is_by("u2"));

        let draft = ReviewDraft::from(&review);
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({ "rating": 9, "Text": "Still holds up" })
        );
    }

    #[test]
    fn test_review_without_author() {
        let review: Review =
            serde_json::from_value(json!({ "_id": "r2", "author": null, "rating": 3 })).unwrap();
        assert_eq!(review.author_name(), "Unknown");
        assert!(!review.is_by("u1"));
        assert_eq!(review.text, "");
    }
}
