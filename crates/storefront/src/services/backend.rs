//! Client for the public EventConnect backend endpoints.
//!
//! Covers event-code validation, one-time-code issuance and verification,
//! business card submission, and the generated PDF download.

use std::sync::Arc;

use eventconnect_core::flow::verification::{CODE_SENT, CODE_VERIFIED};
use eventconnect_core::types::business_card::CARD_SAVED;
use eventconnect_core::{BusinessCardSubmission, Email, OtpCode, RedemptionCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::BackendConfig;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Backend answered 2xx but not with the expected confirmation.
    #[error("Unexpected response: {0}")]
    Unexpected(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateCouponResponse {
    #[serde(default)]
    is_valid: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveCardResponse {
    #[serde(default)]
    message: String,
    pdf_url: Option<String>,
}

/// Backend API client.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: with_trailing_slash(config.url.clone()),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Ask whether an event code unlocks the verification flow.
    ///
    /// A 4xx answer counts as "not valid"; the backend was reached and said no.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a 5xx status, or an unreadable
    /// 2xx body.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn validate_event_code(&self, code: &RedemptionCode) -> Result<bool, BackendError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("api/admin/validate-coupon")?)
            .json(&serde_json::json!({ "eventCode": code }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_client_error() {
            tracing::debug!(status = %status, "Event code refused");
            return Ok(false);
        }
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let parsed: ValidateCouponResponse =
            serde_json::from_str(&body).map_err(|e| parse_error(&e, &body))?;
        Ok(parsed.is_valid)
    }

    /// Send a one-time code to `email`.
    ///
    /// # Errors
    ///
    /// Returns error unless the backend confirms the code was sent.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn request_code(&self, email: &Email) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("api/tokens/generate")?)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let parsed: MessageResponse =
            serde_json::from_str(&body).map_err(|e| parse_error(&e, &body))?;
        if parsed.message == CODE_SENT {
            Ok(())
        } else {
            Err(BackendError::Unexpected(parsed.message))
        }
    }

    /// Check a one-time code for `email`.
    ///
    /// Returns `Ok(false)` when the backend refuses the code (4xx, or a 2xx
    /// without the verified confirmation).
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a 5xx status, or an unreadable
    /// 2xx body.
    #[instrument(skip(self, code), fields(email = %email))]
    pub async fn verify_code(&self, email: &Email, code: &OtpCode) -> Result<bool, BackendError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("api/tokens/verify")?)
            .json(&serde_json::json!({ "code": code, "email": email }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_client_error() {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let parsed: MessageResponse =
            serde_json::from_str(&body).map_err(|e| parse_error(&e, &body))?;
        Ok(parsed.message == CODE_VERIFIED)
    }

    /// Save a business card and return the absolute URL of its PDF.
    ///
    /// # Errors
    ///
    /// Returns error unless the backend confirms the save and supplies a
    /// PDF location.
    #[instrument(skip(self, submission), fields(email = %submission.email, code = %submission.redeem_code))]
    pub async fn save_business_card(
        &self,
        submission: &BusinessCardSubmission,
    ) -> Result<Url, BackendError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("api/business-cards")?)
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let parsed: SaveCardResponse =
            serde_json::from_str(&body).map_err(|e| parse_error(&e, &body))?;
        if parsed.message != CARD_SAVED {
            return Err(BackendError::Unexpected(parsed.message));
        }
        let pdf_url = parsed
            .pdf_url
            .ok_or_else(|| BackendError::Parse("missing pdfUrl".to_string()))?;
        self.resolve(&pdf_url)
    }

    /// Download a generated PDF.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download_pdf(&self, url: &Url) -> Result<Vec<u8>, BackendError> {
        let response = self.inner.client.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Check that the backend answers at all.
    ///
    /// # Errors
    ///
    /// Returns error if no HTTP response arrives within the timeout.
    pub async fn ping(&self) -> Result<(), BackendError> {
        self.inner
            .client
            .get(self.inner.base_url.clone())
            .send()
            .await?;
        Ok(())
    }

    /// Resolve a backend-supplied location against the base URL.
    fn resolve(&self, location: &str) -> Result<Url, BackendError> {
        resolve_location(&self.inner.base_url, location)
    }
}

/// Absolute locations are used as-is; relative ones hang off the base URL.
fn resolve_location(base: &Url, location: &str) -> Result<Url, BackendError> {
    if let Ok(url) = Url::parse(location) {
        return Ok(url);
    }
    Ok(base.join(location.trim_start_matches('/'))?)
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn api_error(status: reqwest::StatusCode, body: &str) -> BackendError {
    tracing::warn!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "Backend returned non-success status"
    );
    BackendError::Api {
        status: status.as_u16(),
        message: body.chars().take(200).collect(),
    }
}

fn parse_error(error: &serde_json::Error, body: &str) -> BackendError {
    tracing::error!(
        error = %error,
        body = %body.chars().take(500).collect::<String>(),
        "Failed to parse backend response"
    );
    BackendError::Parse(error.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_pdf_location_joins_base() {
        let base = with_trailing_slash(Url::parse("http://localhost:3006").unwrap());
        let url = resolve_location(&base, "/pdfs/card-1.pdf").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3006/pdfs/card-1.pdf");
    }

    #[test]
    fn test_relative_location_keeps_base_path() {
        let base = with_trailing_slash(Url::parse("https://api.example.org/backend").unwrap());
        let url = resolve_location(&base, "/pdfs/card-1.pdf").unwrap();
        assert_eq!(url.as_str(), "https://api.example.org/backend/pdfs/card-1.pdf");
    }

    #[test]
    fn test_absolute_pdf_location_is_kept() {
        let base = with_trailing_slash(Url::parse("http://localhost:3006").unwrap());
        let url = resolve_location(&base, "https://cdn.example.org/c.pdf").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/c.pdf");
    }
}
