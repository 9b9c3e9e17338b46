//! # Navigation context relay
//!
//! Hands transient view state across one route transition. The results view
//! [`depart`](NavigationRelay::depart)s with a [`NavigationContext`], the
//! detail view [`arrive`](NavigationRelay::arrive)s and keeps it, and its
//! "back" action hands it over again with [`back`](NavigationRelay::back)
//! so the results view can restore itself without searching again.
//!
//! The relay holds at most one context and every `arrive` empties it, so a
//! context lives for exactly one hop. It is in-memory only; a full reload
//! loses it and "back" falls back to a default route.
//!
//! The relay is generic over what it carries. The add-to-library flow uses a
//! `NavigationRelay<CatalogGame>` to hand the chosen game to the entry form.

use std::sync::{Arc, Mutex, PoisonError};

use api::GameRef;

use crate::guard::AppRoute;

/// A results view's state as carried to a detail view and back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationContext {
    pub origin_query: String,
    pub origin_results: Vec<GameRef>,
    pub came_from_search: bool,
}

/// Where "back" leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackTarget {
    /// The origin view; its context is waiting in the relay.
    Return(AppRoute),
    /// Nothing was carried.
    Default(AppRoute),
}

impl BackTarget {
    pub fn route(&self) -> &AppRoute {
        match self {
            BackTarget::Return(route) | BackTarget::Default(route) => route,
        }
    }
}

pub struct NavigationRelay<C = NavigationContext> {
    slot: Arc<Mutex<Option<C>>>,
}

impl<C> Clone for NavigationRelay<C> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<C> Default for NavigationRelay<C> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<C> PartialEq for NavigationRelay<C> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<C> NavigationRelay<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carry `context` into the next view, replacing anything stale.
    pub fn depart(&self, context: C) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(context);
    }

    /// Take the carried context, if any.
    pub fn arrive(&self) -> Option<C> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Go back with the context the current view arrived with.
    pub fn back(&self, carried: Option<C>, origin: AppRoute, fallback: AppRoute) -> BackTarget {
        match carried {
            Some(context) => {
                self.depart(context);
                BackTarget::Return(origin)
            }
            None => BackTarget::Default(fallback),
        }
    }
}

impl NavigationRelay<NavigationContext> {
    /// "Back" from a game's detail page. Without a search to return to it
    /// goes to the dashboard.
    pub fn back_to_search(&self, carried: Option<NavigationContext>) -> BackTarget {
        self.back(
            carried.filter(|c| c.came_from_search),
            AppRoute::SearchGames,
            AppRoute::Dashboard,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::CatalogGame;

    fn halo_context() -> NavigationContext {
        NavigationContext {
            origin_query: "Halo".into(),
            origin_results: vec![GameRef::Catalog(CatalogGame {
                id: 740,
                name: "Halo: Combat Evolved".into(),
                ..Default::default()
            })],
            came_from_search: true,
        }
    }

    #[test]
    fn test_context_lives_for_one_hop() {
        let relay = NavigationRelay::new();
        relay.depart(halo_context());

        assert_eq!(relay.arrive(), Some(halo_context()));
        assert_eq!(relay.arrive(), None);
        assert!(relay.is_empty());
    }

    #[test]
    fn test_back_returns_carried_context() {
        let relay = NavigationRelay::new();
        relay.depart(halo_context());
        let carried = relay.arrive();

        let target = relay.back_to_search(carried);
        assert_eq!(target, BackTarget::Return(AppRoute::SearchGames));
        assert_eq!(relay.arrive(), Some(halo_context()));
    }

    #[test]
    fn test_direct_entry_falls_back_to_default() {
        let relay: NavigationRelay = NavigationRelay::new();

        let target = relay.back_to_search(relay.arrive());
        assert_eq!(target, BackTarget::Default(AppRoute::Dashboard));
        assert_eq!(target.route().path(), "/");
        assert!(relay.is_empty());
    }

    #[test]
    fn test_context_not_from_search_is_not_restored() {
        let relay: NavigationRelay = NavigationRelay::new();
        let context = NavigationContext {
            came_from_search: false,
            ..halo_context()
        };

        let target = relay.back_to_search(Some(context));
        assert_eq!(target, BackTarget::Default(AppRoute::Dashboard));
        assert!(relay.is_empty());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let relay = NavigationRelay::<CatalogGame>::new();
        let form_side = relay.clone();
        relay.depart(CatalogGame {
            id: 1020,
            name: "Grand Theft Auto V".into(),
            ..Default::default()
        });

        assert_eq!(form_side.arrive().map(|g| g.id), Some(1020));
        assert!(relay.is_empty());
    }
}
