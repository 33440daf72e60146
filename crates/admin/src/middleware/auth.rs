//! The `authToken` cookie and the extractor that reads it.
//!
//! The token is the identity provider's ID token. The console never
//! inspects it; it is only forwarded to the backend, which decides whether
//! it is still good.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use secrecy::SecretString;

/// Name of the credential cookie.
pub const AUTH_COOKIE: &str = "authToken";

/// Lifetime of the credential cookie.
const AUTH_COOKIE_MAX_AGE_DAYS: i64 = 7;

/// Build the credential cookie set at sign-in.
#[must_use]
pub fn auth_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::days(AUTH_COOKIE_MAX_AGE_DAYS))
        .secure(secure)
        .build()
}

/// A cookie that removes the credential from the browser.
#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// Whether the jar holds a non-empty credential.
#[must_use]
pub fn has_token(jar: &CookieJar) -> bool {
    jar.get(AUTH_COOKIE).is_some_and(|c| !c.value().is_empty())
}

/// Extractor for the signed-in admin's credential.
///
/// The route guard already keeps credential-less requests away from
/// protected pages; a handler reached without one redirects to the login
/// page all the same.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(token: AuthToken) -> impl IntoResponse {
///     backend.list_coupons(token.secret(), &query).await
/// }
/// ```
pub struct AuthToken(SecretString);

impl AuthToken {
    /// The bearer credential.
    #[must_use]
    pub const fn secret(&self) -> &SecretString {
        &self.0
    }
}

/// Rejection for requests without a credential.
pub struct MissingToken;

impl IntoResponse for MissingToken {
    fn into_response(self) -> Response {
        Redirect::to("/admin").into_response()
    }
}

impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = MissingToken;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        jar.get(AUTH_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
            .map(|v| Self(SecretString::from(v)))
            .ok_or(MissingToken)
    }
}
