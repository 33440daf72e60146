//! Client for the identity provider's password sign-in endpoint.
//!
//! Admins sign in with email and password; the provider answers with an ID
//! token that the console stores in the `authToken` cookie and forwards to
//! the backend as a bearer credential.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::IdentityConfig;

/// Shown for the provider's invalid-credential family of errors.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Shown for every other sign-in failure.
pub const SIGN_IN_FAILED: &str = "An error occurred during sign in";

/// Provider error codes that mean the email/password pair was wrong.
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_PASSWORD",
    "EMAIL_NOT_FOUND",
    "INVALID_EMAIL",
];

/// Errors that can occur during sign-in.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the email/password pair.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The provider returned any other error.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl IdentityError {
    /// The message to show on the login page.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials(_) => INVALID_CREDENTIALS,
            _ => SIGN_IN_FAILED,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(
        config: &IdentityConfig,
        timeout: std::time::Duration,
    ) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = format!(
            "{}/accounts:signInWithPassword",
            config.base_url.trim_end_matches('/')
        );

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                endpoint,
                api_key: config.api_key.clone(),
            }),
        })
    }

    /// Exchange an email and password for an ID token.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidCredentials`] when the provider
    /// refuses the pair, and other variants for transport or provider faults.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SecretString, IdentityError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .json(&serde_json::json!({
                "email": email,
                "password": password.expose_secret(),
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let code = error_code(&body);
            tracing::info!(status = %status, code = %code, "Sign-in refused");
            if CREDENTIAL_ERROR_CODES.contains(&code.as_str()) {
                return Err(IdentityError::InvalidCredentials(code));
            }
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: code,
            });
        }

        let parsed: SignInResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse sign-in response"
            );
            IdentityError::Parse(e.to_string())
        })?;

        Ok(SecretString::from(parsed.id_token))
    }
}

/// Extract the provider's error code from an error body.
///
/// Messages look like `INVALID_LOGIN_CREDENTIALS` or
/// `TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account...`; the code is
/// the part before `" : "`.
fn error_code(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| body.chars().take(200).collect(),
        |envelope| {
            envelope
                .error
                .message
                .split(" : ")
                .next()
                .unwrap_or_default()
                .trim()
                .to_owned()
        },
    )
}
