//! Unified error handling for admin.
//!
//! Listing and mutation failures are rendered as notices on the page the
//! admin is on. The only failure that leaves the page is a refused
//! credential, which ends the session.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use thiserror::Error;

use crate::middleware::auth::removal_cookie;

/// Where an admin lands after the backend refuses their credential.
pub const SESSION_EXPIRED_LOCATION: &str = "/admin?expired=true";

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// The backend refused the admin credential.
    ///
    /// `htmx` is set for fragment requests, which must be redirected with
    /// `HX-Redirect` rather than a `Location` the XHR would follow.
    #[error("Session expired")]
    SessionExpired { htmx: bool },
}

impl AppError {
    /// The backend answered 401 to a full-page request.
    #[must_use]
    pub const fn session_expired() -> Self {
        Self::SessionExpired { htmx: false }
    }

    /// Mark an error as raised while serving an HTMX fragment.
    #[must_use]
    pub const fn in_fragment(self) -> Self {
        match self {
            Self::SessionExpired { .. } => Self::SessionExpired { htmx: true },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Self::SessionExpired { htmx } = self;
        tracing::info!(htmx, "Admin session expired");
        let jar = CookieJar::new().add(removal_cookie());
        if htmx {
            return (
                jar,
                [(
                    HeaderName::from_static("hx-redirect"),
                    HeaderValue::from_static(SESSION_EXPIRED_LOCATION),
                )],
                StatusCode::NO_CONTENT,
            )
                .into_response();
        }
        (jar, Redirect::to(SESSION_EXPIRED_LOCATION)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in admin.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_owned()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header::{LOCATION, SET_COOKIE};

    use super::*;

    #[test]
    fn test_unauthorized_expires_session() {
        let response = AppError::session_expired().into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            SESSION_EXPIRED_LOCATION
        );
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("authToken="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_fragment_expiry_uses_hx_redirect() {
        let response = AppError::session_expired()
            .in_fragment()
            .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get("hx-redirect").unwrap(),
            SESSION_EXPIRED_LOCATION
        );
        assert!(response.headers().get(SET_COOKIE).is_some());
    }
}
