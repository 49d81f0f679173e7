//! Application routes and the authentication guard.

use crate::SessionStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    SignIn,
    SignOn,
    Profile,
    ForgetPassword,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Home,
        Route::SignIn,
        Route::SignOn,
        Route::Profile,
        Route::ForgetPassword,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::SignIn => "sign_in",
            Route::SignOn => "sign_on",
            Route::Profile => "profile",
            Route::ForgetPassword => "forget_password",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::SignIn => "/sign_in",
            Route::SignOn => "/sign_on",
            Route::Profile => "/profile",
            Route::ForgetPassword => "/forget_password",
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Profile)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Route {
    type Err = String;

    /// Accepts a route name (`sign_in`, `sign-in`) or its path (`/sign_in`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Route::ALL
            .into_iter()
            .find(|route| route.name() == normalized || route.path() == normalized)
            .ok_or_else(|| format!("unknown route: {s}"))
    }
}

/// Applies the authentication guard to navigation requests.
#[derive(Clone)]
pub struct Router {
    session: SessionStore,
}

impl Router {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// The route actually shown for `requested`: guarded routes fall back to
    /// [`Route::Home`] when the session is not authenticated.
    pub fn resolve(&self, requested: Route) -> Route {
        if requested.requires_auth() && !self.session.is_authenticated() {
            tracing::debug!(route = %requested, "Route requires authentication, redirecting home");
            return Route::Home;
        }
        requested
    }
}
