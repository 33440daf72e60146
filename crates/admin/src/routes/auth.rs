//! Sign-in and sign-out route handlers.
//!
//! The login form is checked locally before the identity provider is
//! called. A successful sign-in stores the ID token in the `authToken`
//! cookie; signing out removes it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use eventconnect_core::{Email, FieldErrors, Notice};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use validator::{Validate, ValidationError};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::guard::{DASHBOARD_PATH, LOGIN_PATH};
use crate::middleware::{auth_cookie, removal_cookie};
use crate::state::AppState;

/// Shown after the backend refused a stored credential.
pub const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

/// Login page query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub expired: bool,
}

/// Login form data.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(custom(function = "parses_as_email", message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Same address rules the storefront applies to visitors.
fn parses_as_email(email: &str) -> Result<(), ValidationError> {
    Email::parse(email)
        .map(|_| ())
        .map_err(|_| ValidationError::new("email"))
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub errors: FieldErrors,
    pub notice: Option<Notice>,
}

/// Render the login page.
///
/// GET /admin
#[instrument]
pub async fn show(Query(query): Query<LoginQuery>) -> LoginTemplate {
    LoginTemplate {
        email: String::new(),
        errors: FieldErrors::new(),
        notice: query.expired.then(|| Notice::error(SESSION_EXPIRED)),
    }
}

/// Sign in with email and password.
///
/// POST /admin
#[instrument(skip(state, jar, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim().to_owned();
    let form = LoginForm { email, ..form };

    if let Err(errors) = form.validate() {
        return LoginTemplate {
            email: form.email,
            errors: FieldErrors::from(errors),
            notice: None,
        }
        .into_response();
    }

    let password = SecretString::from(form.password);
    match state.identity().sign_in(&form.email, &password).await {
        Ok(token) => {
            tracing::info!(email = %form.email, "Admin signed in");
            set_sentry_user(&form.email);
            let cookie = auth_cookie(
                token.expose_secret().to_owned(),
                state.config().is_secure(),
            );
            (jar.add(cookie), Redirect::to(DASHBOARD_PATH)).into_response()
        }
        Err(e) => {
            tracing::warn!(email = %form.email, error = %e, "Admin sign-in failed");
            LoginTemplate {
                email: form.email,
                errors: FieldErrors::new(),
                notice: Some(Notice::error(e.user_message())),
            }
            .into_response()
        }
    }
}

/// Remove the credential and return to the login page.
///
/// POST /admin/logout
#[instrument(skip(jar))]
pub async fn sign_out(jar: CookieJar) -> (CookieJar, Redirect) {
    tracing::info!("Admin signed out");
    clear_sentry_user();
    (jar.add(removal_cookie()), Redirect::to(LOGIN_PATH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_notice() {
        let page = show(Query(LoginQuery { expired: true })).await;
        assert!(page.render().unwrap().contains(SESSION_EXPIRED));

        let page = show(Query(LoginQuery::default())).await;
        assert!(page.notice.is_none());
    }

    #[test]
    fn test_login_form_rules() {
        let form = LoginForm {
            email: "not-an-email".to_string(),
            password: "12345".to_string(),
        };
        let errors = FieldErrors::from(form.validate().unwrap_err());
        assert_eq!(errors.get("email"), Some("Invalid email address"));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );

        let form = LoginForm {
            email: "admin@eventconnect.app".to_string(),
            password: "123456".to_string(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_login_email_matches_storefront_rules() {
        for email in ["user@localhost", "user@.com", "a b@c.com", "@c.com"] {
            let form = LoginForm {
                email: email.to_string(),
                password: "123456".to_string(),
            };
            assert!(Email::parse(email).is_err(), "{email}");
            assert!(form.validate().is_err(), "{email}");
        }
    }

    #[tokio::test]
    async fn test_sign_out_clears_cookie() {
        let jar = CookieJar::new().add(auth_cookie("tok".to_string(), false));
        let response = sign_out(jar).await.into_response();
        assert_eq!(response.headers().get("location").unwrap(), "/admin");
        let cookies: Vec<_> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("authToken=") && c.contains("Max-Age=0")));
    }
}
