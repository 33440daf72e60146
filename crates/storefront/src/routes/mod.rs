//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redemption gate
//! POST /redeem                 - Submit an event code
//!
//! # Verification (every request carries a redemption pass)
//! GET  /verify                 - Verification page for the pass's flow
//! POST /verify/email           - Request a one-time code
//! POST /verify/code            - Check a one-time code
//! POST /verify/resend          - Resend the code once the cooldown is over
//! POST /verify/back            - Return to the email step
//!
//! # Business card
//! POST /card                   - Save the card and hand off its PDF
//! GET  /card/pdf/{ticket}      - One-shot PDF download
//!
//! # Health
//! GET  /health                 - Liveness
//! GET  /health/ready           - Backend reachability
//! ```

pub mod card;
pub mod health;
pub mod redeem;
pub mod verify;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Create the verification routes router.
pub fn verify_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(verify::show))
        .route("/email", post(verify::request_code))
        .route("/code", post(verify::check_code))
        .route("/resend", post(verify::resend_code))
        .route("/back", post(verify::back_to_email))
}

/// Create the business card routes router.
pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(card::save))
        .route("/pdf/{ticket}", get(card::download))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(redeem::show))
        .route("/redeem", post(redeem::redeem))
        .nest("/verify", verify_routes())
        .nest("/card", card_routes())
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// The complete storefront application with its request-level middleware.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .nest_service("/static", ServeDir::new("crates/storefront/static"))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
