//! Session middleware configuration for admin.
//!
//! Sessions only carry one-shot flash notices across the redirect that
//! follows a coupon mutation, so an in-memory store is enough.

use eventconnect_core::Notice;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::AdminConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "eventconnect_admin_session";

/// Session expiry time in seconds (24 hours of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

const FLASH_KEY: &str = "flash";

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &AdminConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

/// Queue a notice for the next page view.
pub async fn set_flash(session: &Session, notice: Notice) {
    if let Err(e) = session.insert(FLASH_KEY, notice).await {
        tracing::warn!(error = %e, "Failed to store flash notice");
    }
}

/// Take the queued notice, if any.
pub async fn take_flash(session: &Session) -> Option<Notice> {
    session.remove::<Notice>(FLASH_KEY).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read flash notice");
        None
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_flash_is_read_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        set_flash(&session, Notice::success("Coupon created successfully!")).await;

        let notice = take_flash(&session).await.unwrap();
        assert_eq!(notice.message, "Coupon created successfully!");
        assert!(take_flash(&session).await.is_none());
    }
}
