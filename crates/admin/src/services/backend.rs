//! Client for the authenticated admin endpoints of the EventConnect backend.
//!
//! Every call carries the signed-in admin's ID token as a bearer credential.
//! A `401` is reported as [`BackendError::Unauthorized`] so handlers can end
//! the admin's session instead of showing a generic failure.

use std::sync::Arc;

use eventconnect_core::pagination::{PAGE_SIZE, Pagination};
use eventconnect_core::{BusinessCard, Coupon, CouponId, NewCoupon, PublishChange};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
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

    /// The bearer credential was refused.
    #[error("Unauthorized")]
    Unauthorized,

    /// Backend returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Listing query sent to both paged endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl ListQuery {
    /// Page `page` of the listing filtered by `search`.
    #[must_use]
    pub fn new(page: u32, search: &str) -> Self {
        Self {
            page: page.max(1),
            limit: PAGE_SIZE,
            search: search.trim().to_owned(),
        }
    }
}

/// One page of coupons.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponPage {
    #[serde(default)]
    pub coupons: Vec<Coupon>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// One page of submitted business cards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCardPage {
    #[serde(default)]
    pub business_cards: Vec<BusinessCard>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Admin backend API client.
#[derive(Clone)]
pub struct AdminBackendClient {
    inner: Arc<AdminBackendClientInner>,
}

struct AdminBackendClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl AdminBackendClient {
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
            inner: Arc::new(AdminBackendClientInner {
                client,
                base_url: with_trailing_slash(config.url.clone()),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn coupon_endpoint(&self, id: &CouponId, suffix: &str) -> Result<Url, BackendError> {
        self.endpoint(&format!(
            "api/admin/coupons/{}{suffix}",
            urlencoding::encode(id.as_str())
        ))
    }

    /// Fetch one page of coupons.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a refused credential, a
    /// non-success status, or an unreadable body.
    #[instrument(skip(self, token))]
    pub async fn list_coupons(
        &self,
        token: &SecretString,
        query: &ListQuery,
    ) -> Result<CouponPage, BackendError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("api/admin/coupons")?)
            .bearer_auth(token.expose_secret())
            .query(query)
            .send()
            .await?;

        let body = read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| parse_error(&e, &body))
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns error unless the backend answers 2xx.
    #[instrument(skip(self, token), fields(code = %coupon.code))]
    pub async fn create_coupon(
        &self,
        token: &SecretString,
        coupon: &NewCoupon,
    ) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("api/admin/coupons")?)
            .bearer_auth(token.expose_secret())
            .json(coupon)
            .send()
            .await?;

        read_body(response).await.map(drop)
    }

    /// Publish or unpublish a coupon.
    ///
    /// # Errors
    ///
    /// Returns error unless the backend answers 2xx.
    #[instrument(skip(self, token), fields(id = %id))]
    pub async fn set_published(
        &self,
        token: &SecretString,
        id: &CouponId,
        is_published: bool,
    ) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .patch(self.coupon_endpoint(id, "/publish")?)
            .bearer_auth(token.expose_secret())
            .json(&PublishChange { is_published })
            .send()
            .await?;

        read_body(response).await.map(drop)
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns error unless the backend answers 2xx.
    #[instrument(skip(self, token), fields(id = %id))]
    pub async fn delete_coupon(
        &self,
        token: &SecretString,
        id: &CouponId,
    ) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .delete(self.coupon_endpoint(id, "")?)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        read_body(response).await.map(drop)
    }

    /// Fetch one page of submitted business cards.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a refused credential, a
    /// non-success status, or an unreadable body.
    #[instrument(skip(self, token))]
    pub async fn list_business_cards(
        &self,
        token: &SecretString,
        query: &ListQuery,
    ) -> Result<BusinessCardPage, BackendError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("api/business-cards")?)
            .bearer_auth(token.expose_secret())
            .query(query)
            .send()
            .await?;

        let body = read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| parse_error(&e, &body))
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
}

/// Read the body of a response, turning non-success statuses into errors.
async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if status == reqwest::StatusCode::UNAUTHORIZED {
        tracing::info!("Backend refused the admin credential");
        return Err(BackendError::Unauthorized);
    }
    if !status.is_success() {
        return Err(api_error(status, &body));
    }
    Ok(body)
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
    use std::time::Duration;

    use super::*;

    fn client() -> AdminBackendClient {
        AdminBackendClient::new(&BackendConfig {
            url: Url::parse("https://api.example.org/backend").unwrap(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::new(0, "  SUMMIT ");
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
        assert_eq!(query.search, "SUMMIT");
    }

    #[test]
    fn test_coupon_endpoint_escapes_id() {
        let url = client()
            .coupon_endpoint(&CouponId::new("a b/c"), "/publish")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.org/backend/api/admin/coupons/a%20b%2Fc/publish"
        );
    }

    #[test]
    fn test_coupon_page_tolerates_missing_pagination() {
        let page: CouponPage = serde_json::from_str(
            r#"{"coupons":[{"_id":"c1","code":"SUMMIT24","validFrom":"2024-05-01T00:00:00.000Z","validTo":"2024-05-03T00:00:00.000Z","isPublished":true}]}"#,
        )
        .unwrap();
        assert_eq!(page.coupons.len(), 1);
        assert_eq!(page.pagination.per_page, 10);
        assert!(!page.pagination.shows_controls());
    }

    #[test]
    fn test_business_card_page_field_names() {
        let page: BusinessCardPage = serde_json::from_str(
            r#"{"businessCards":[{"_id":"b1","fullName":"Ada Lovelace","email":"a@b.com","redeemCode":"SUMMIT24"}],
                "pagination":{"total":25,"currentPage":2,"totalPages":3,"perPage":10}}"#,
        )
        .unwrap();
        assert_eq!(page.business_cards[0].redeem_code, "SUMMIT24");
        assert_eq!(page.pagination.current_page, 2);
        assert!(page.pagination.shows_controls());
    }
}
