//! Integration tests for EventConnect.
//!
//! The tests drive the real storefront and admin routers over HTTP against
//! an in-process mock of the backend API and the identity provider.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p eventconnect-integration-tests
//! ```
//!
//! Nothing external is required; every server binds an ephemeral port on
//! `127.0.0.1`.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use eventconnect_core::flow::verification::{CODE_SENT, CODE_VERIFIED};
use eventconnect_core::types::business_card::CARD_SAVED;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

/// The one event code the mock backend accepts.
pub const VALID_EVENT_CODE: &str = "SUMMIT24";
/// The one-time code the mock backend accepts.
pub const VALID_OTP: &str = "123456";
/// Admin credentials the mock identity provider accepts.
pub const ADMIN_EMAIL: &str = "admin@eventconnect.app";
pub const ADMIN_PASSWORD: &str = "correct-horse";
/// ID token issued for the admin; any other bearer gets a 401.
pub const ADMIN_TOKEN: &str = "admin-id-token";
/// Bytes served as the generated business card PDF.
pub const PDF_BYTES: &[u8] = b"%PDF-1.4 mock business card";

/// A request the mock backend received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// Requests seen by the mock backend, in arrival order.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Recorded>>>);

impl Journal {
    fn record(&self, method: &str, path: &str, body: Value) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Recorded {
                method: method.to_owned(),
                path: path.to_owned(),
                body,
            });
    }

    /// All recorded requests.
    #[must_use]
    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded requests matching `method` and `path`.
    #[must_use]
    pub fn matching(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.all()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

/// A running mock of the backend API and identity provider.
pub struct MockBackend {
    pub url: Url,
    pub journal: Journal,
}

impl MockBackend {
    /// Start the mock on an ephemeral port.
    pub async fn start() -> Self {
        let journal = Journal::default();
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .route("/api/admin/validate-coupon", post(validate_coupon))
            .route("/api/tokens/generate", post(generate_token))
            .route("/api/tokens/verify", post(verify_token))
            .route(
                "/api/business-cards",
                post(save_business_card).get(list_business_cards),
            )
            .route("/pdfs/{file}", get(pdf))
            .route("/api/admin/coupons", get(list_coupons).post(create_coupon))
            .route("/api/admin/coupons/{id}/publish", patch(publish_coupon))
            .route(
                "/api/admin/coupons/{id}",
                axum::routing::delete(delete_coupon),
            )
            .fallback(identity)
            .with_state(journal.clone());

        let addr = serve(app).await;
        Self {
            url: Url::parse(&format!("http://{addr}")).unwrap(),
            journal,
        }
    }
}

/// Serve `app` on an ephemeral port and return its address.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Start the storefront against `backend` and return its base URL.
pub async fn spawn_storefront(backend: &MockBackend) -> String {
    spawn_storefront_at(backend.url.clone()).await
}

/// Start the storefront against an arbitrary backend URL.
pub async fn spawn_storefront_at(backend_url: Url) -> String {
    use eventconnect_storefront::config::{BackendConfig, StorefrontConfig};

    let config = StorefrontConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        pass_secret: SecretString::from("iNt3gr@tion!pass#signing$material%42"),
        pass_ttl: Duration::from_secs(600),
        backend: BackendConfig {
            url: backend_url,
            timeout: Duration::from_secs(5),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    };
    let state = eventconnect_storefront::state::AppState::new(config).unwrap();
    let addr = serve(eventconnect_storefront::routes::app(state)).await;
    format!("http://{addr}")
}

/// Start the admin console against `backend` and return its base URL.
pub async fn spawn_admin(backend: &MockBackend) -> String {
    use eventconnect_admin::config::{AdminConfig, BackendConfig, IdentityConfig};

    let config = AdminConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        backend: BackendConfig {
            url: backend.url.clone(),
            timeout: Duration::from_secs(5),
        },
        identity: IdentityConfig {
            base_url: backend.url.join("v1").unwrap().to_string(),
            api_key: SecretString::from("AIzaSyD-integration-key-0123"),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    };
    let state = eventconnect_admin::state::AppState::new(config).unwrap();
    let addr = serve(eventconnect_admin::routes::app(state)).await;
    format!("http://{addr}")
}

/// An HTTP client that does not follow redirects, so tests can inspect them.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// The `Location` header of a response.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// A client with a cookie store, for flows that span a session.
#[must_use]
pub fn session_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// A base URL nothing is listening on.
pub async fn unreachable_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}

// =============================================================================
// Mock handlers
// =============================================================================

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {ADMIN_TOKEN}").as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid token" })),
    )
        .into_response()
}

async fn validate_coupon(State(journal): State<Journal>, Json(body): Json<Value>) -> Response {
    journal.record("POST", "/api/admin/validate-coupon", body.clone());
    if body["eventCode"] == VALID_EVENT_CODE {
        Json(json!({ "isValid": true })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "isValid": false, "message": "Invalid coupon" })),
        )
            .into_response()
    }
}

async fn generate_token(State(journal): State<Journal>, Json(body): Json<Value>) -> Json<Value> {
    journal.record("POST", "/api/tokens/generate", body);
    Json(json!({ "message": CODE_SENT }))
}

async fn verify_token(State(journal): State<Journal>, Json(body): Json<Value>) -> Response {
    journal.record("POST", "/api/tokens/verify", body.clone());
    if body["code"] == VALID_OTP {
        Json(json!({ "message": CODE_VERIFIED })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid or expired code" })),
        )
            .into_response()
    }
}

async fn save_business_card(State(journal): State<Journal>, Json(body): Json<Value>) -> Json<Value> {
    journal.record("POST", "/api/business-cards", body);
    // Keeps a second submission in flight long enough to overlap.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Json(json!({ "message": CARD_SAVED, "pdfUrl": "/pdfs/card-1.pdf" }))
}

async fn pdf(Path(file): Path<String>) -> Response {
    if file == "card-1.pdf" {
        (
            [(header::CONTENT_TYPE, "application/pdf")],
            Bytes::from_static(PDF_BYTES),
        )
            .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn list_business_cards(
    State(journal): State<Journal>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    journal.record("GET", "/api/business-cards", json!(query));
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "businessCards": [{
            "_id": "b1",
            "fullName": "Ada Lovelace",
            "title": "Engineer",
            "phone": "1234567890",
            "email": "ada@example.com",
            "companyName": "Analytical Co",
            "address": "12 Engine Row",
            "redeemCode": VALID_EVENT_CODE,
            "certifications": []
        }],
        "pagination": { "total": 1, "currentPage": 1, "totalPages": 1, "perPage": 10 }
    }))
    .into_response()
}

async fn list_coupons(
    State(journal): State<Journal>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    journal.record("GET", "/api/admin/coupons", json!(query));
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "coupons": [{
            "_id": "c1",
            "code": VALID_EVENT_CODE,
            "validFrom": "2024-05-01T00:00:00.000Z",
            "validTo": "2024-05-03T00:00:00.000Z",
            "isPublished": false
        }],
        "pagination": { "total": 1, "currentPage": 1, "totalPages": 1, "perPage": 10 }
    }))
    .into_response()
}

async fn create_coupon(
    State(journal): State<Journal>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    journal.record("POST", "/api/admin/coupons", body);
    if !authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::CREATED, Json(json!({ "message": "Coupon created" }))).into_response()
}

async fn publish_coupon(
    State(journal): State<Journal>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    journal.record("PATCH", &format!("/api/admin/coupons/{id}/publish"), body);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "message": "Coupon updated" })).into_response()
}

async fn delete_coupon(
    State(journal): State<Journal>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    journal.record("DELETE", &format!("/api/admin/coupons/{id}"), Value::Null);
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response();
    }
    Json(json!({ "message": "Coupon deleted" })).into_response()
}

/// Identity provider password sign-in; the path contains a colon, so it is
/// matched here rather than through the router.
async fn identity(State(journal): State<Journal>, uri: Uri, body: Bytes) -> Response {
    if !uri.path().ends_with("/accounts:signInWithPassword") {
        return StatusCode::NOT_FOUND.into_response();
    }
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    journal.record("POST", "/v1/accounts:signInWithPassword", body.clone());

    if body["email"] == ADMIN_EMAIL && body["password"] == ADMIN_PASSWORD {
        Json(json!({ "idToken": ADMIN_TOKEN, "email": ADMIN_EMAIL })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" } })),
        )
            .into_response()
    }
}
