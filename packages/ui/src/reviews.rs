//! # Reviews
//!
//! Reviews of one game, kept in a [`Synchronizer`] over [`ReviewRemote`].
//! The one-review-per-author rule is an affordance, not a guarantee: the
//! "write review" action is offered only while the fetched set holds no
//! review by the current user ([`can_write_review`]). The server rejects a
//! second review anyway and that rejection is surfaced like any other.

use api::{ApiClient, ApiError, Review, ReviewDraft, UserIdentity};

use crate::session::SessionManager;
use crate::sync::{Record, Remote, Synchronizer, Validate, ViewScope};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 10;

impl Record for Review {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Validate for ReviewDraft {
    fn validate(&self) -> Result<(), String> {
        if (MIN_RATING..=MAX_RATING).contains(&self.rating) {
            Ok(())
        } else {
            Err(format!(
                "Rating must be between {} and {}.",
                MIN_RATING, MAX_RATING
            ))
        }
    }
}

#[derive(Clone)]
pub struct ReviewRemote {
    api: ApiClient,
    igdb_id: u64,
}

impl ReviewRemote {
    pub fn new(api: ApiClient, igdb_id: u64) -> Self {
        Self { api, igdb_id }
    }

    pub fn igdb_id(&self) -> u64 {
        self.igdb_id
    }
}

impl Remote for ReviewRemote {
    type Item = Review;
    type Draft = ReviewDraft;
    type Patch = ReviewDraft;

    async fn list(&self) -> Result<Vec<Review>, ApiError> {
        self.api.game_reviews(self.igdb_id).await
    }

    async fn create(&self, draft: &ReviewDraft) -> Result<Review, ApiError> {
        self.api.create_review(self.igdb_id, draft).await
    }

    async fn update(&self, id: &str, patch: &ReviewDraft) -> Result<Review, ApiError> {
        self.api.update_review(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete_review(id).await
    }
}

/// Reviews of `igdb_id`, seeded with an already fetched set (the details
/// response carries one).
pub fn game_reviews(
    session: &SessionManager,
    igdb_id: u64,
    fetched: Vec<Review>,
    view: ViewScope,
) -> Synchronizer<ReviewRemote> {
    Synchronizer::with_items(ReviewRemote::new(session.api().clone(), igdb_id), fetched)
        .bound_to(view)
        .reporting_to(session.clone())
}

pub fn own_review<'a>(reviews: &'a [Review], identity: Option<&UserIdentity>) -> Option<&'a Review> {
    let identity = identity?;
    reviews.iter().find(|r| r.is_by(&identity.id))
}

pub fn can_write_review(reviews: &[Review], identity: Option<&UserIdentity>) -> bool {
    identity.is_some() && own_review(reviews, identity).is_none()
}
