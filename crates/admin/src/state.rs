//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::services::{AdminBackendClient, BackendError, IdentityClient, IdentityError};

/// Errors raised while building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    backend: AdminBackendClient,
    identity: IdentityClient,
}

impl AppState {
    /// Build the state and its HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client fails to build.
    pub fn new(config: AdminConfig) -> Result<Self, StateError> {
        let backend = AdminBackendClient::new(&config.backend)?;
        let identity = IdentityClient::new(&config.identity, config.backend.timeout)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                identity,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &AdminBackendClient {
        &self.inner.backend
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }
}
