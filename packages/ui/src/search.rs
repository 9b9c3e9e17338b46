//! Catalog search state, restorable from a [`NavigationContext`].

use api::{ApiClient, ApiError, CatalogGame, GameRef};
use serde::{Deserialize, Serialize};

use crate::navigation::{NavigationContext, NavigationRelay};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    /// As typed.
    pub query: String,
    pub results: Vec<CatalogGame>,
}

impl SearchState {
    /// Run a search. Blank queries are not sent; returns whether one was.
    pub async fn search(&mut self, api: &ApiClient, query: &str) -> Result<bool, ApiError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }
        let results = api.search_games(trimmed).await?;
        tracing::debug!("Search {:?} returned {} games", trimmed, results.len());
        self.query = query.to_string();
        self.results = results;
        Ok(true)
    }

    /// Context to carry into a result's detail page.
    pub fn context(&self) -> NavigationContext {
        NavigationContext {
            origin_query: self.query.clone(),
            origin_results: self.results.iter().cloned().map(GameRef::Catalog).collect(),
            came_from_search: true,
        }
    }

    pub fn restore(context: NavigationContext) -> Self {
        let results = context
            .origin_results
            .into_iter()
            .map(|game| match game {
                GameRef::Catalog(game) => game,
                GameRef::Library(game) => CatalogGame::from(&game),
            })
            .collect();
        Self {
            query: context.origin_query,
            results,
        }
    }

    /// State for a freshly mounted search view: whatever "back" handed over.
    pub fn restore_from(relay: &NavigationRelay) -> Option<Self> {
        relay
            .arrive()
            .filter(|c| c.came_from_search)
            .map(Self::restore)
    }
}
