//! Routes and the auth gate.
//!
//! The gate is evaluated on every navigation and never caches: a logout or a
//! 401-triggered clear takes effect on the very next decision.

use std::fmt;
use std::sync::Arc;

use crate::session::TokenStore;

/// Any absolute base works; it only anchors relative locations for parsing.
const PARSE_BASE: &str = "http://cvopt.local/";

/// Navigable views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Unauthenticated entry view.
    Login,
    Register,
    ForgotPassword,
    /// Token comes from the `?token=` query of the reset link.
    ResetPassword { token: Option<String> },
    /// Protected view.
    Dashboard,
}

impl Route {
    /// Parses a path or full URL. Unknown paths fall back to login.
    pub fn parse(location: &str) -> Self {
        let Some(url) = url::Url::parse(PARSE_BASE)
            .ok()
            .and_then(|base| base.join(location.trim()).ok())
        else {
            return Route::Login;
        };

        match url.path().trim_end_matches('/') {
            "/register" => Route::Register,
            "/forgot-password" => Route::ForgotPassword,
            "/reset-password" => Route::ResetPassword {
                token: url
                    .query_pairs()
                    .find(|(key, _)| key == "token")
                    .map(|(_, value)| value.trim().to_string())
                    .filter(|value| !value.is_empty()),
            },
            "/dashboard" => Route::Dashboard,
            _ => Route::Login,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Register => "/register",
            Route::ForgotPassword => "/forgot-password",
            Route::ResetPassword { .. } => "/reset-password",
            Route::Dashboard => "/dashboard",
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Result of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow(Route),
    Redirect(Route),
}

impl Navigation {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Navigation::Allow(_))
    }

    /// The view that actually renders.
    pub fn route(&self) -> &Route {
        match self {
            Navigation::Allow(route) | Navigation::Redirect(route) => route,
        }
    }
}

/// Decides whether a view may render given the current session.
#[derive(Debug, Clone)]
pub struct AuthGate {
    tokens: Arc<TokenStore>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenStore>) -> Self {
        Self { tokens }
    }

    pub fn permits(&self, route: &Route) -> bool {
        !route.is_protected() || self.tokens.is_authenticated()
    }

    pub fn navigate(&self, route: Route) -> Navigation {
        if self.permits(&route) {
            Navigation::Allow(route)
        } else {
            tracing::debug!(%route, "no session; redirecting to login");
            Navigation::Redirect(Route::Login)
        }
    }
}
