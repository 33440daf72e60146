//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (flash notices)
//! 6. Route guard (credential presence for `/admin/*`)

pub mod auth;
pub mod guard;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{AUTH_COOKIE, AuthToken, auth_cookie, removal_cookie};
pub use guard::route_guard;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, set_flash, take_flash};
