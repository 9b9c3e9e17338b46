//! Session context, hooks and guard components for the UI.

use dioxus::prelude::*;

use crate::guard::{decide, AppRoute, Fallback, RenderDecision};
use crate::navigation::{NavigationContext, NavigationRelay};
use crate::session::{SessionEvent, SessionManager, SessionState};

/// Provider component that shares one session with every view.
/// Wrap your app with this component.
#[component]
pub fn SessionProvider(session: SessionManager, children: Element) -> Element {
    let mut state = use_signal(|| session.state());
    let session = use_context_provider(|| session);
    use_context_provider(|| state);
    use_context_provider(NavigationRelay::<NavigationContext>::new);

    // Mirror the watch channel into the signal so guarded views re-render
    use_future(move || {
        let session = session.clone();
        async move {
            let mut changes = session.subscribe();
            while changes.changed().await.is_ok() {
                let next = changes.borrow_and_update().clone();
                state.set(next);
            }
        }
    });

    rsx! {
        {children}
    }
}

pub fn use_session() -> SessionManager {
    use_context::<SessionManager>()
}

/// Current session state; updates on sign-in, sign-out and expiry.
pub fn use_session_state() -> Signal<SessionState> {
    use_context::<Signal<SessionState>>()
}

pub fn use_navigation_relay() -> NavigationRelay {
    use_context::<NavigationRelay>()
}

/// Latest session notification, for a toast.
pub fn use_session_event() -> Signal<Option<SessionEvent>> {
    let session = use_session();
    let mut latest = use_signal(|| None);
    use_future(move || {
        let session = session.clone();
        async move {
            let mut events = session.events();
            loop {
                match events.recv().await {
                    Ok(event) => latest.set(Some(event)),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Skipped {} session events", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    });
    latest
}

/// Renders `children` only when the route's guard allows it.
///
/// The decision is recomputed on every render from the session signal.
/// Routes that fall back to the public home view render `home`. Redirects
/// are reported through `on_redirect`; the router decides how to navigate.
#[component]
pub fn Guarded(
    route: AppRoute,
    children: Element,
    home: Option<Element>,
    #[props(default)] on_redirect: EventHandler<AppRoute>,
) -> Element {
    let state = use_session_state();
    let decision = decide(&route.policy(), state.read().identity());

    // Re-runs when the session changes or the route prop does
    use_effect(use_reactive!(|route| {
        let decision = decide(&route.policy(), state.read().identity());
        if let RenderDecision::Redirect(target) = decision {
            on_redirect.call(target);
        }
    }));

    match decision {
        RenderDecision::Render => rsx! {
            {children}
        },
        RenderDecision::Fallback(Fallback::Home) => rsx! {
            {home}
        },
        RenderDecision::Fallback(Fallback::Message(message)) => rsx! {
            p { class: "guard-fallback", "{message}" }
        },
        RenderDecision::Redirect(_) => rsx! {},
    }
}

/// Button to sign the current user out.
#[component]
pub fn SignOutButton(
    #[props(default = "Sign Out".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let session = use_session();

    rsx! {
        button {
            class: "{class}",
            onclick: move |_| session.sign_out(),
            "{label}"
        }
    }
}
