//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! GET  /admin                          - Login page
//! POST /admin                          - Sign in
//! POST /admin/logout                   - Sign out
//!
//! # Business cards (read-only)
//! GET  /admin/dashboard                - Card listing
//! GET  /admin/dashboard/table          - Table fragment
//!
//! # Coupons
//! GET  /admin/coupons                  - Coupon manager
//! GET  /admin/coupons/table            - Table fragment
//! POST /admin/coupons                  - Create
//! POST /admin/coupons/{id}/publish     - Publish or unpublish
//! GET  /admin/coupons/{id}/delete      - Delete confirmation
//! POST /admin/coupons/{id}/delete      - Delete
//!
//! # Health
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Backend reachability
//! ```

pub mod auth;
pub mod coupons;
pub mod dashboard;
pub mod health;

use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::services::ServeDir;

use crate::middleware::{
    create_session_layer, request_id_middleware, route_guard, security_headers_middleware,
};
use crate::state::AppState;

/// Paging and search parameters shared by both listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub search: String,
}

impl ListingQuery {
    /// The requested page, starting at 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Build a listing URL that keeps the page and search.
#[must_use]
pub fn listing_url(path: &str, page: u32, search: &str) -> String {
    let search = search.trim();
    match (page.max(1), search.is_empty()) {
        (1, true) => path.to_owned(),
        (page, true) => format!("{path}?page={page}"),
        (page, false) => format!("{path}?page={page}&search={}", urlencoding::encode(search)),
    }
}

/// Whether the request was issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .is_some_and(|v| v.as_bytes() == b"true")
}

/// Create the coupon manager routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route("/table", get(coupons::table))
        .route("/{id}/publish", post(coupons::publish))
        .route(
            "/{id}/delete",
            get(coupons::confirm_delete).post(coupons::delete),
        )
}

/// Create all routes for the admin console.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(auth::show).post(auth::sign_in))
        .route("/admin/logout", post(auth::sign_out))
        .route("/admin/dashboard", get(dashboard::show))
        .route("/admin/dashboard/table", get(dashboard::table))
        .nest("/admin/coupons", coupon_routes())
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// The complete admin application with its request-level middleware.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    Router::new()
        .merge(routes())
        .nest_service("/static", ServeDir::new("crates/admin/static"))
        .layer(axum::middleware::from_fn(route_guard))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{AdminConfig, BackendConfig, IdentityConfig};

    fn test_app() -> Router {
        let config = AdminConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            backend: BackendConfig {
                // Nothing listens here; calls fail fast with a refused connection.
                url: Url::parse("http://127.0.0.1:9").unwrap(),
                timeout: Duration::from_secs(1),
            },
            identity: IdentityConfig {
                base_url: "http://127.0.0.1:9/v1".to_string(),
                api_key: SecretString::from("AIzaSyD-test-key-0123456789"),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        app(AppState::new(config).unwrap())
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(listing_url("/admin/coupons", 1, " "), "/admin/coupons");
        assert_eq!(listing_url("/admin/coupons", 2, ""), "/admin/coupons?page=2");
        assert_eq!(
            listing_url("/admin/dashboard", 0, "a&b"),
            "/admin/dashboard?page=1&search=a%26b"
        );
    }

    #[tokio::test]
    async fn test_login_page_renders_with_headers() {
        let response = test_app()
            .oneshot(get_request("/admin", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(body_text(response).await.contains("name=\"password\""));
    }

    #[tokio::test]
    async fn test_dashboard_requires_cookie() {
        let response = test_app()
            .oneshot(get_request("/admin/dashboard", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin");
    }

    #[tokio::test]
    async fn test_signed_in_login_goes_to_dashboard() {
        let response = test_app()
            .oneshot(get_request("/admin", Some("authToken=abc")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/admin/dashboard"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_shows_notice() {
        let response = test_app()
            .oneshot(get_request("/admin/dashboard", Some("authToken=abc")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Failed to fetch business cards"));
    }

    #[tokio::test]
    async fn test_invalid_login_never_calls_identity() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=nope&password=123"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Invalid email address"));
        assert!(!body.contains("An error occurred during sign in"));
    }

    #[tokio::test]
    async fn test_inverted_dates_rejected_in_place() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/coupons")
                    .header(header::COOKIE, "authToken=abc")
                    .header("hx-request", "true")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "code=SUMMIT24&validFrom=2024-05-03&validTo=2024-05-01",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Valid to date cannot be earlier than valid from date"));
        assert!(!body.contains("Failed to create coupon"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(get_request("/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
