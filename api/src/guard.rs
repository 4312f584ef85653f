//! Navigation decisions as pure functions of auth state.
//!
//! Operations on [`Auth`](crate::auth::Auth) return [`Route`] values and
//! never navigate themselves; an embedding router interprets them. The
//! guard re-runs [`check`] on every state change it observes.

use crate::auth::AuthState;

/// Navigation targets, as data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Verify,
    Home,
    FamilySetup,
    /// An arbitrary in-app path, e.g. a stored post-auth redirect target.
    To(String),
}

impl Route {
    pub fn path(&self) -> &str {
        match self {
            Route::Login => "/login",
            Route::Verify => "/verify",
            Route::Home => "/home",
            Route::FamilySetup => "/family-setup",
            Route::To(path) => path,
        }
    }
}

/// Outcome of guarding a protected view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    /// Initial load still in flight; show a spinner, do not redirect yet.
    Loading,
    Allow,
    Redirect(Route),
}

/// Decide whether a protected view is reachable for the given state.
pub fn check(state: &AuthState) -> Access {
    if state.loading {
        return Access::Loading;
    }
    if state.user.is_none() {
        return Access::Redirect(Route::Login);
    }
    if state.families.is_empty() {
        return Access::Redirect(Route::FamilySetup);
    }
    Access::Allow
}

/// Landing route after a successful sign-in.
pub fn landing(state: &AuthState) -> Route {
    if state.families.is_empty() {
        Route::FamilySetup
    } else {
        Route::Home
    }
}
