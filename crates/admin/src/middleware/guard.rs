//! Route guard for the admin namespace.
//!
//! A presence check only: a request for an admin page without the
//! credential cookie is sent to the login page, and a signed-in admin who
//! opens the login page is sent to the dashboard. Whether the credential
//! is still valid is decided by the backend on the next call.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::auth::has_token;

/// The login page.
pub const LOGIN_PATH: &str = "/admin";

/// Where signed-in admins start.
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

/// What the guard does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    ToLogin,
    ToDashboard,
}

/// Decide what to do with a request for `path`.
#[must_use]
pub fn decide(path: &str, has_token: bool) -> GuardDecision {
    let is_login = path == LOGIN_PATH;
    let in_namespace = is_login || path.starts_with("/admin/");

    match (in_namespace, is_login, has_token) {
        (true, false, false) => GuardDecision::ToLogin,
        (true, true, true) => GuardDecision::ToDashboard,
        _ => GuardDecision::Continue,
    }
}

/// Middleware applying [`decide`] to every request.
pub async fn route_guard(jar: CookieJar, request: Request, next: Next) -> Response {
    match decide(request.uri().path(), has_token(&jar)) {
        GuardDecision::Continue => next.run(request).await,
        GuardDecision::ToLogin => {
            tracing::debug!(path = %request.uri().path(), "No credential, redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
        GuardDecision::ToDashboard => Redirect::to(DASHBOARD_PATH).into_response(),
    }
}
